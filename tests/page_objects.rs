use std::sync::Arc;
use std::thread;
use std::time::Duration;

use thirtyfour_pages::mock::{MockDriver, MockElement};
use thirtyfour_pages::prelude::*;
use thirtyfour_pages::LocatorConfig;

struct LoginPage {
    page: Page,
}

impl PageObject for LoginPage {
    fn page(&self) -> &Page {
        &self.page
    }
}

impl LoginPage {
    const USERNAME: Element = Element::new("username", By::Id, "username")
        .timeout(Duration::from_millis(300))
        .poll_interval(Duration::from_millis(20));
    const SUBMIT: Element = Element::new("submit", By::Css, "button.submit")
        .timeout(Duration::from_millis(300))
        .poll_interval(Duration::from_millis(20));
    const BANNER: Element = Element::unbound("banner");
    const ERRORS: Elements = Elements::new("errors", By::ClassName, "error")
        .timeout(Duration::from_millis(100))
        .poll_interval(Duration::from_millis(20));
    const FIELD: DynamicElement<&'static str> =
        DynamicElement::new("field", |name| Locator::new(By::Name, name));

    fn new(driver: &Arc<MockDriver>) -> Self {
        LoginPage {
            page: Page::new(driver.clone()),
        }
    }

    fn login(&self, user: &str) -> PageResult<()> {
        Self::USERNAME.get(self)?.clear()?.send_keys(user)?;
        Self::SUBMIT.get(self)?.click()?;
        Ok(())
    }
}

fn login_form() -> (Arc<MockDriver>, thirtyfour_pages::ElementId, thirtyfour_pages::ElementId) {
    let driver = Arc::new(MockDriver::new());
    let username = driver.add_element(MockElement::new().tag("input"));
    let submit = driver.add_element(MockElement::new().tag("button").texts(vec!["Sign in"]));
    driver.set_matches(By::Id, "username", vec![username.clone()]);
    driver.set_matches(By::Css, "button.submit", vec![submit.clone()]);
    (driver, username, submit)
}

#[test]
fn login_flow() -> color_eyre::Result<()> {
    let (driver, username, _) = login_form();
    let page = LoginPage::new(&driver);
    page.login("alice")?;
    assert_eq!(driver.typed_text(&username), "alice");
    assert_eq!(driver.clicks(), 1);
    Ok(())
}

#[test]
fn unbound_attribute_fails_until_set() -> color_eyre::Result<()> {
    let (driver, _, _) = login_form();
    let page = LoginPage::new(&driver);
    assert!(matches!(LoginPage::BANNER.get(&page), Err(PageError::UnboundLocator { .. })));

    let banner = driver.add_element(MockElement::new().texts(vec!["Welcome"]));
    driver.set_matches(By::Css, ".banner", vec![banner]);
    LoginPage::BANNER.set(&page, (By::Css, ".banner"))?;
    assert_eq!(LoginPage::BANNER.get(&page)?.text()?, "Welcome");
    Ok(())
}

#[test]
fn resolved_handles_are_cached() -> color_eyre::Result<()> {
    let (driver, _, _) = login_form();
    let page = LoginPage::new(&driver);
    assert_eq!(LoginPage::SUBMIT.get(&page)?.text()?, "Sign in");
    let finds = driver.find_count();
    assert_eq!(LoginPage::SUBMIT.get(&page)?.text()?, "Sign in");
    assert_eq!(driver.find_count(), finds);

    page.page().clear_cache();
    LoginPage::SUBMIT.get(&page)?.text()?;
    assert!(driver.find_count() > finds);
    Ok(())
}

#[test]
fn rebinding_is_per_instance() -> color_eyre::Result<()> {
    let (driver, _, _) = login_form();
    let first = LoginPage::new(&driver);
    let second = LoginPage::new(&driver);

    LoginPage::SUBMIT.set(&first, LocatorConfig {
        by: String::from("xpath"),
        value: String::from("//button"),
        ..LocatorConfig::default()
    })?;
    assert_eq!(LoginPage::SUBMIT.locator(&first)?.by(), By::XPath);
    assert_eq!(LoginPage::SUBMIT.locator(&second)?.value(), "button.submit");
    Ok(())
}

#[test]
fn rebinding_leaves_other_caches_alone() -> color_eyre::Result<()> {
    let (driver, _, _) = login_form();
    let first = LoginPage::new(&driver);
    let second = LoginPage::new(&driver);
    assert_eq!(LoginPage::SUBMIT.get(&second)?.text()?, "Sign in");
    let finds = driver.find_count();

    LoginPage::SUBMIT.set(&first, (By::Css, "button.other"))?;
    assert_eq!(LoginPage::SUBMIT.get(&second)?.text()?, "Sign in");
    assert_eq!(driver.find_count(), finds);
    Ok(())
}

#[test]
fn held_references_keep_their_locator_after_a_rebind() -> color_eyre::Result<()> {
    let driver = Arc::new(MockDriver::new());
    let old = driver.add_element(MockElement::new().texts(vec!["old"]));
    let new = driver.add_element(MockElement::new().texts(vec!["new"]));
    driver.set_matches(By::Css, ".old", vec![old]);
    driver.set_matches(By::Css, ".new", vec![new]);
    let page = LoginPage::new(&driver);
    LoginPage::BANNER.set(&page, (By::Css, ".old"))?;
    let held = LoginPage::BANNER.get(&page)?;

    LoginPage::BANNER.set(&page, (By::Css, ".new"))?;
    assert_eq!(held.text()?, "old");
    assert_eq!(LoginPage::BANNER.get(&page)?.text()?, "new");
    assert_eq!(held.text()?, "old");
    Ok(())
}

#[test]
fn page_object_and_its_page_share_bindings() -> color_eyre::Result<()> {
    let driver = Arc::new(MockDriver::new());
    let banner = driver.add_element(MockElement::new().texts(vec!["Welcome"]));
    driver.set_matches(By::Css, ".banner", vec![banner]);
    let login = LoginPage::new(&driver);

    LoginPage::BANNER.set(&login, (By::Css, ".banner"))?;
    assert_eq!(LoginPage::BANNER.get(login.page())?.text()?, "Welcome");
    assert_eq!(LoginPage::BANNER.locator(login.page())?, LoginPage::BANNER.locator(&login)?);
    Ok(())
}

#[test]
fn plural_attribute_with_no_matches() -> color_eyre::Result<()> {
    let (driver, _, _) = login_form();
    let page = LoginPage::new(&driver);
    let errors = LoginPage::ERRORS.get(&page)?;
    assert_eq!(errors.quantity()?, 0);
    assert!(!errors.any_visible()?);
    Ok(())
}

#[test]
fn dynamic_elements_resolve_independently() -> color_eyre::Result<()> {
    let driver = Arc::new(MockDriver::new());
    let email = driver.add_element(MockElement::new().attribute("type", "email"));
    let phone = driver.add_element(MockElement::new().attribute("type", "tel"));
    driver.set_matches(By::Name, "email", vec![email]);
    driver.set_matches(By::Name, "phone", vec![phone]);
    let page = LoginPage::new(&driver);

    let a = LoginPage::FIELD.get(&page, "email")?;
    let b = LoginPage::FIELD.get(&page, "phone")?;
    assert_eq!(a.attribute("type")?.as_deref(), Some("email"));
    assert_eq!(b.attribute("type")?.as_deref(), Some("tel"));
    assert_eq!(page.page().cached_entries(), 0);
    Ok(())
}

#[test]
fn pages_move_between_threads() -> color_eyre::Result<()> {
    let (driver, _, _) = login_form();
    let page = LoginPage::new(&driver);
    let text = thread::spawn(move || -> PageResult<String> {
        let submit = LoginPage::SUBMIT.get(&page)?;
        submit.text()
    })
        .join()
        .map_err(|_| color_eyre::eyre::eyre!("worker thread panicked"))??;
    assert_eq!(text, "Sign in");
    Ok(())
}
