use std::time::Duration;

use thirtyfour_pages::config::{self, WaitDefaults};
use thirtyfour_pages::prelude::*;

// Installing is process-wide, so everything that depends on it lives in this one test.
#[test]
fn defaults_install_once() -> color_eyre::Result<()> {
    let defaults = WaitDefaults::new(Duration::from_secs(2), Duration::from_millis(250))?;
    config::install(defaults)?;
    assert_eq!(config::defaults(), defaults);

    let again = WaitDefaults::new(Duration::from_secs(9), Duration::from_secs(1))?;
    assert!(matches!(config::install(again), Err(PageError::Configuration(_))));
    assert_eq!(config::defaults().timeout(), Duration::from_secs(2));

    let locator = Locator::new(By::Css, "main")?;
    assert_eq!(locator.timeout(), Duration::from_secs(2));
    assert_eq!(locator.poll_interval(), Duration::from_millis(250));
    assert_eq!(
        ElementPoller::TimeoutWithInterval(Duration::from_secs(2), Duration::from_millis(250)),
        locator.poller()
    );
    Ok(())
}
