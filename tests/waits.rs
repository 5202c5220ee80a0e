use std::sync::Arc;
use std::time::{Duration, Instant};

use thirtyfour_pages::mock::{MockDriver, MockElement};
use thirtyfour_pages::prelude::*;

const TOAST: Element = Element::new("toast", By::Css, ".toast")
    .timeout(Duration::from_secs(5))
    .poll_interval(Duration::from_millis(100));
const SAVE: Element = Element::new("save", By::Id, "save")
    .timeout(Duration::from_secs(1))
    .poll_interval(Duration::from_millis(200));
const ROWS: Elements = Elements::new("rows", By::Css, "tr")
    .timeout(Duration::from_secs(1))
    .poll_interval(Duration::from_millis(50));

fn setup() -> (Arc<MockDriver>, Page) {
    let driver = Arc::new(MockDriver::new());
    let page = Page::new(driver.clone());
    (driver, page)
}

#[test]
fn waits_until_visible() -> color_eyre::Result<()> {
    let (driver, page) = setup();
    let id = driver.add_element(MockElement::new().displayed_states(vec![false, false, true]));
    driver.set_matches(By::Css, ".toast", vec![id]);

    let started = Instant::now();
    TOAST.get(&page)?.wait_visible()?;
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(200), "returned after {:?}", elapsed);
    assert!(elapsed < Duration::from_secs(2), "returned after {:?}", elapsed);
    Ok(())
}

#[test]
fn boolean_waits_return_false_on_timeout() -> color_eyre::Result<()> {
    let (driver, page) = setup();
    let id = driver.add_element(MockElement::new().enabled(false));
    driver.set_matches(By::Id, "save", vec![id]);

    let started = Instant::now();
    assert!(!SAVE.get(&page)?.is_clickable()?);
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(1), "returned after {:?}", elapsed);
    assert!(elapsed < Duration::from_secs(3), "returned after {:?}", elapsed);
    Ok(())
}

#[test]
fn raising_waits_time_out_with_a_message() -> color_eyre::Result<()> {
    let (driver, page) = setup();
    let id = driver.add_element(MockElement::new().enabled(false));
    driver.set_matches(By::Id, "save", vec![id]);

    match SAVE.get(&page)?.wait_clickable() {
        Err(PageError::Timeout(message)) => assert_eq!(
            message,
            "Waiting for element \"save\" to become \"clickable\" timed out after 1 seconds."
        ),
        r => panic!("unexpected result: {:?}", r.map(|_| ())),
    }
    Ok(())
}

#[test]
fn wait_clickable_gives_up_after_its_timeout() -> color_eyre::Result<()> {
    let (driver, page) = setup();
    let id = driver.add_element(MockElement::new().enabled(false));
    driver.set_matches(By::Id, "save", vec![id]);

    let started = Instant::now();
    assert!(matches!(SAVE.get(&page)?.wait_clickable(), Err(PageError::Timeout(_))));
    let elapsed = started.elapsed();
    // One second, give or take one 200ms poll.
    assert!(elapsed >= Duration::from_millis(800), "returned after {:?}", elapsed);
    assert!(elapsed <= Duration::from_millis(1500), "returned after {:?}", elapsed);
    Ok(())
}

#[test]
fn plural_actions_relocate_stale_matches() -> color_eyre::Result<()> {
    let (driver, page) = setup();
    let old = vec![driver.add_element(MockElement::new()), driver.add_element(MockElement::new())];
    driver.set_matches(By::Css, "tr", old.clone());
    let rows = ROWS.get(&page)?;
    assert_eq!(rows.quantity()?, 2);

    let fresh = vec![driver.add_element(MockElement::new()), driver.add_element(MockElement::new())];
    for id in &old {
        driver.make_stale(id);
    }
    driver.set_matches(By::Css, "tr", fresh.clone());
    let started = Instant::now();
    rows.click_all()?;
    assert_eq!(driver.clicks(), 2);
    assert!(started.elapsed() < Duration::from_secs(1), "returned after {:?}", started.elapsed());
    assert_eq!(ROWS.get(&page)?.handles()?, fresh);
    Ok(())
}

#[test]
fn plural_waits() -> color_eyre::Result<()> {
    let (driver, page) = setup();
    let ids = vec![
        driver.add_element(MockElement::new().displayed(false)),
        driver.add_element(MockElement::new()),
        driver.add_element(MockElement::new().displayed(false)),
    ];
    driver.set_matches(By::Css, "tr", ids);

    let rows = ROWS.get(&page)?;
    assert_eq!(rows.quantity()?, 3);
    assert!(rows.any_visible()?);
    assert!(!rows.wait_until().at_most(Duration::from_millis(200)).are_all_visible()?);
    Ok(())
}

#[test]
fn fatal_driver_errors_abort_immediately() -> color_eyre::Result<()> {
    let (driver, page) = setup();
    driver.end_session();

    let started = Instant::now();
    assert!(matches!(TOAST.get(&page)?.is_visible(), Err(PageError::FatalDriver(_))));
    assert!(started.elapsed() < Duration::from_secs(1));
    Ok(())
}

#[test]
fn transient_errors_are_retried() -> color_eyre::Result<()> {
    let (driver, page) = setup();
    let id = driver.add_element(MockElement::new().texts(vec!["Saved"]));
    driver.set_matches(By::Css, ".toast", vec![id]);
    driver.inject_transient_errors(3);
    assert_eq!(TOAST.get(&page)?.text()?, "Saved");
    Ok(())
}

#[test]
fn page_waits_on_navigation() -> color_eyre::Result<()> {
    let (_, page) = setup();
    page.get("http://example.test/inbox?page=2")?;
    page.wait_until().wait(Duration::from_millis(200), Duration::from_millis(20)).url_contains("/inbox")?;
    assert!(!page
        .wait_until()
        .wait(Duration::from_millis(100), Duration::from_millis(20))
        .url_matches("http://example.test/login")?);
    Ok(())
}
