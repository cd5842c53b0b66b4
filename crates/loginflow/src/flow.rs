//! The login flow: six sequential steps from the landing page to a verified
//! one-time passcode.
//!
//! Every step blocks only through [`wait_until`] with the policy it is handed,
//! captures evidence once its action lands, and returns a human-readable
//! confirmation string.

use crate::config::{Credentials, Site, SuiteConfig};
use crate::driver::{BrowserDriver, ElementState, MockDriver, MockEffect, MockWindow, WindowHandle};
use crate::error::{FlowError, FlowResult};
use crate::locator::Locator;
use crate::session::Session;
use crate::wait::{wait_until, Condition, WaitPolicy};
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Landing page of the application under test
pub const SITE_URL: &str = "https://dfperformance.azurewebsites.net/";

/// Title the landing page must carry
pub const EXPECTED_TITLE: &str = "Datafortune Performance Accelerator-Stage";

/// Button on the landing page that opens the identity provider
pub const LOGIN_BUTTON_XPATH: &str = "//button[contains(@class, 'btn loginButton')]";

/// Account name field
pub const USERNAME_FIELD_ID: &str = "i0116";

/// Shared "Next" / "Sign in" / "Yes" button of the identity provider
pub const NEXT_BUTTON_ID: &str = "idSIButton9";

/// Password field
pub const PASSWORD_FIELD_XPATH: &str = "//input[@type='password']";

/// One-time passcode field
pub const OTP_FIELD_NAME: &str = "otc";

/// Passcode verify button
pub const VERIFY_BUTTON_ID: &str = "idSubmit_SAOTCC_Continue";

/// Login button locator
#[must_use]
pub fn login_button() -> Locator {
    Locator::xpath(LOGIN_BUTTON_XPATH)
}

/// Username field locator
#[must_use]
pub fn username_field() -> Locator {
    Locator::id(USERNAME_FIELD_ID)
}

/// Next button locator
#[must_use]
pub fn next_button() -> Locator {
    Locator::id(NEXT_BUTTON_ID)
}

/// Password field locator
#[must_use]
pub fn password_field() -> Locator {
    Locator::xpath(PASSWORD_FIELD_XPATH)
}

/// OTP field locator
#[must_use]
pub fn otp_field() -> Locator {
    Locator::name(OTP_FIELD_NAME)
}

/// Verify button locator
#[must_use]
pub fn verify_button() -> Locator {
    Locator::id(VERIFY_BUTTON_ID)
}

// =============================================================================
// POLICIES AND OUTCOMES
// =============================================================================

/// What happened to the optional "Stay signed in?" prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptOutcome {
    /// Prompt appeared and was confirmed
    Dismissed,
    /// Prompt never became clickable within the wait policy
    Absent,
}

/// How the identity-provider window is picked after the login click
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NewWindowPolicy {
    /// Exactly one new window must exist
    #[default]
    RequireSingle,
    /// First window in enumeration order that is not the original
    FirstListed,
}

impl NewWindowPolicy {
    /// Pick the window to switch to
    pub fn select(self, original: &str, handles: &[WindowHandle]) -> FlowResult<WindowHandle> {
        let mut candidates = handles.iter().filter(|h| h.as_str() != original);
        match self {
            Self::FirstListed => candidates
                .next()
                .cloned()
                .ok_or_else(|| FlowError::session("no new window opened")),
            Self::RequireSingle => {
                let candidates: Vec<&WindowHandle> = candidates.collect();
                match candidates.as_slice() {
                    [only] => Ok((*only).clone()),
                    [] => Err(FlowError::session("no new window opened")),
                    many => Err(FlowError::AmbiguousWindow { count: many.len() }),
                }
            }
        }
    }
}

// =============================================================================
// STEPS
// =============================================================================

async fn fill<D: BrowserDriver>(
    session: &mut Session<D>,
    locator: &Locator,
    text: &str,
) -> FlowResult<()> {
    session.driver_mut().clear(locator).await?;
    session.driver_mut().type_text(locator, text).await
}

async fn click_when_clickable<D: BrowserDriver>(
    session: &mut Session<D>,
    locator: &Locator,
    wait: &WaitPolicy,
) -> FlowResult<()> {
    wait_until(session.driver(), &Condition::Clickable(locator.clone()), wait).await?;
    session.driver_mut().click(locator).await
}

/// Step 1: load the landing page and wait for its title
pub async fn open_website<D: BrowserDriver>(
    session: &mut Session<D>,
    site: &Site,
    wait: &WaitPolicy,
) -> FlowResult<String> {
    session.driver_mut().navigate(&site.url).await?;
    session.driver_mut().maximize_window().await?;
    wait_until(
        session.driver(),
        &Condition::TitleContains(site.expected_title.clone()),
        wait,
    )
    .await?;
    session.capture("website_opened").await;
    Ok("Website opened successfully".to_string())
}

/// Step 2: assert the exact title
///
/// The wait for exact equality runs first, so a wrong title usually surfaces
/// as a timeout rather than a mismatch.
pub async fn verify_title<D: BrowserDriver>(
    session: &mut Session<D>,
    expected: &str,
    wait: &WaitPolicy,
) -> FlowResult<String> {
    wait_until(session.driver(), &Condition::TitleIs(expected.to_string()), wait).await?;
    let actual = session.driver().title().await?;
    if actual != expected {
        return Err(FlowError::TitleMismatch {
            expected: expected.to_string(),
            actual,
        });
    }
    session.capture("title_verified").await;
    Ok(format!("Title verified: {actual}"))
}

/// Step 3: click the login button and move to the identity-provider window
pub async fn navigate_to_microsoft_login_page<D: BrowserDriver>(
    session: &mut Session<D>,
    wait: &WaitPolicy,
    window_policy: NewWindowPolicy,
) -> FlowResult<String> {
    let original = session.driver().current_window().await?;
    click_when_clickable(session, &login_button(), wait).await?;
    wait_until(session.driver(), &Condition::WindowCountAbove(1), wait).await?;

    let handles = session.driver().window_handles().await?;
    let target = window_policy.select(&original, &handles)?;
    tracing::debug!(window = %target, open = handles.len(), "switching to login window");
    session.driver_mut().switch_to_window(&target).await?;

    session.capture("microsoft_login_page").await;
    Ok("Navigated to Microsoft login page".to_string())
}

/// Step 4: submit the account name
pub async fn enter_username<D: BrowserDriver>(
    session: &mut Session<D>,
    username: &str,
    wait: &WaitPolicy,
) -> FlowResult<String> {
    let field = username_field();
    wait_until(session.driver(), &Condition::Present(field.clone()), wait).await?;
    fill(session, &field, username).await?;
    click_when_clickable(session, &next_button(), wait).await?;
    session.capture("username_entered").await;
    Ok(format!("Username entered: {username}"))
}

/// Step 5: submit the password
pub async fn enter_password<D: BrowserDriver>(
    session: &mut Session<D>,
    password: &str,
    wait: &WaitPolicy,
) -> FlowResult<String> {
    let url = session.driver().current_url().await?;
    tracing::info!(url = %url, "on password page");
    session.capture("pre_password_page").await;

    let field = password_field();
    wait_until(session.driver(), &Condition::Visible(field.clone()), wait).await?;
    fill(session, &field, password).await?;
    click_when_clickable(session, &next_button(), wait).await?;
    session.capture("password_entered").await;
    Ok("Password entered successfully".to_string())
}

/// Confirm the "Stay signed in?" prompt if it shows up
///
/// Only a timeout counts as absence; any other error propagates.
pub async fn dismiss_stay_signed_in<D: BrowserDriver>(
    session: &mut Session<D>,
    wait: &WaitPolicy,
) -> FlowResult<PromptOutcome> {
    let button = next_button();
    match wait_until(session.driver(), &Condition::Clickable(button.clone()), wait).await {
        Ok(_) => {}
        Err(e) if e.is_timeout() => {
            tracing::warn!("'Stay signed in' prompt not shown, continuing");
            return Ok(PromptOutcome::Absent);
        }
        Err(e) => return Err(e),
    }
    session.driver_mut().click(&button).await?;
    session.capture("stay_signed_in").await;
    Ok(PromptOutcome::Dismissed)
}

/// Step 6: get past the optional prompt and submit the passcode
pub async fn enter_otp<D: BrowserDriver>(
    session: &mut Session<D>,
    otp: &str,
    wait: &WaitPolicy,
) -> FlowResult<String> {
    let prompt = dismiss_stay_signed_in(session, wait).await?;
    tracing::debug!(?prompt, "stay signed in prompt handled");

    let field = otp_field();
    wait_until(session.driver(), &Condition::Visible(field.clone()), wait).await?;
    fill(session, &field, otp).await?;
    click_when_clickable(session, &verify_button(), wait).await?;
    session.capture("otp_verified").await;
    Ok(format!("OTP {otp} entered and verified"))
}

/// Inputs every step may draw on
#[derive(Debug, Clone, Default)]
pub struct StepInputs {
    /// Shared wait policy
    pub wait: WaitPolicy,
    /// Site under test
    pub site: Site,
    /// Test identity
    pub credentials: Credentials,
    /// Identity-provider window selection
    pub window_policy: NewWindowPolicy,
}

impl StepInputs {
    /// Take the step inputs out of a suite configuration
    #[must_use]
    pub fn from_config(config: &SuiteConfig) -> Self {
        Self {
            wait: config.wait,
            site: config.site.clone(),
            credentials: config.credentials.clone(),
            window_policy: config.window_policy,
        }
    }
}

/// One of the six flow steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    /// Load the landing page
    OpenWebsite,
    /// Assert the exact title
    VerifyTitle,
    /// Switch to the identity provider
    NavigateToLogin,
    /// Submit the account name
    EnterUsername,
    /// Submit the password
    EnterPassword,
    /// Submit the passcode
    EnterOtp,
}

impl Step {
    /// All steps in flow order
    pub const ALL: [Self; 6] = [
        Self::OpenWebsite,
        Self::VerifyTitle,
        Self::NavigateToLogin,
        Self::EnterUsername,
        Self::EnterPassword,
        Self::EnterOtp,
    ];

    /// Report title of the step
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::OpenWebsite => "Open the website",
            Self::VerifyTitle => "Verify website title",
            Self::NavigateToLogin => "Navigate to Microsoft login page",
            Self::EnterUsername => "Enter username",
            Self::EnterPassword => "Enter password",
            Self::EnterOtp => "Enter and verify OTP",
        }
    }

    /// Execute the step
    pub async fn run<D: BrowserDriver>(
        &self,
        session: &mut Session<D>,
        inputs: &StepInputs,
    ) -> FlowResult<String> {
        tracing::info!(step = self.name(), "step started");
        let wait = &inputs.wait;
        let creds = &inputs.credentials;
        let result = match self {
            Self::OpenWebsite => open_website(session, &inputs.site, wait).await,
            Self::VerifyTitle => verify_title(session, &inputs.site.expected_title, wait).await,
            Self::NavigateToLogin => {
                navigate_to_microsoft_login_page(session, wait, inputs.window_policy).await
            }
            Self::EnterUsername => enter_username(session, &creds.username, wait).await,
            Self::EnterPassword => enter_password(session, &creds.password, wait).await,
            Self::EnterOtp => enter_otp(session, &creds.otp, wait).await,
        };
        match &result {
            Ok(message) => tracing::info!(step = self.name(), %message, "step finished"),
            Err(e) => tracing::info!(step = self.name(), error = %e, "step failed"),
        }
        result
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// SCRIPTED SITE
// =============================================================================

/// Handle of the identity-provider window in [`scripted_login_site`]
pub const SCRIPTED_IDP_WINDOW: &str = "identity-provider";

/// A [`MockDriver`] that walks through the whole login flow
///
/// The landing page opens a single identity-provider window whose shared
/// button advances username → password → (optional prompt) → passcode.
#[must_use]
pub fn scripted_login_site(site: &Site, prompt: bool) -> MockDriver {
    let idp = MockWindow::new(SCRIPTED_IDP_WINDOW)
        .with_title("Sign in to your account")
        .with_url("https://login.microsoftonline.com/")
        .with_element(username_field(), ElementState::INTERACTABLE)
        .with_element(next_button(), ElementState::INTERACTABLE);

    let show_otp = [
        MockEffect::Show(otp_field(), ElementState::INTERACTABLE),
        MockEffect::Show(verify_button(), ElementState::INTERACTABLE),
    ];

    let after_password = if prompt {
        vec![
            MockEffect::Remove(password_field()),
            MockEffect::SetTitle("Stay signed in?".to_string()),
        ]
    } else {
        let mut effects = vec![
            MockEffect::Remove(password_field()),
            MockEffect::Remove(next_button()),
        ];
        effects.extend(show_otp.clone());
        effects
    };

    let mut driver = MockDriver::new()
        .on_navigate(MockEffect::SetTitle(site.expected_title.clone()))
        .on_navigate(MockEffect::Show(login_button(), ElementState::INTERACTABLE))
        .on_click(login_button(), vec![MockEffect::OpenWindow(idp)])
        .on_click(
            next_button(),
            vec![MockEffect::Show(password_field(), ElementState::INTERACTABLE)],
        )
        .on_click(next_button(), after_password)
        .on_click(verify_button(), vec![MockEffect::SetUrl(site.url.clone())]);

    if prompt {
        let mut effects = vec![MockEffect::Remove(next_button())];
        effects.extend(show_otp);
        driver = driver.on_click(next_button(), effects);
    }
    driver
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick() -> WaitPolicy {
        WaitPolicy::new().with_timeout(60).with_poll_interval(5)
    }

    fn inputs() -> StepInputs {
        StepInputs {
            wait: quick(),
            site: Site::default(),
            credentials: Credentials::new("qa@example.com", "s3cret", "123456"),
            window_policy: NewWindowPolicy::RequireSingle,
        }
    }

    async fn run_steps(session: &mut Session<MockDriver>, n: usize) -> FlowResult<String> {
        let inputs = inputs();
        let mut last = String::new();
        for step in &Step::ALL[..n] {
            last = step.run(session, &inputs).await?;
        }
        Ok(last)
    }

    mod window_policy_tests {
        use super::*;

        fn handles(names: &[&str]) -> Vec<WindowHandle> {
            names.iter().map(ToString::to_string).collect()
        }

        #[test]
        fn test_require_single() {
            let policy = NewWindowPolicy::RequireSingle;
            assert_eq!(policy.select("a", &handles(&["a", "b"])).unwrap(), "b");
            assert!(matches!(
                policy.select("a", &handles(&["a", "b", "c"])),
                Err(FlowError::AmbiguousWindow { count: 2 })
            ));
            assert!(policy.select("a", &handles(&["a"])).is_err());
        }

        #[test]
        fn test_first_listed() {
            let policy = NewWindowPolicy::FirstListed;
            assert_eq!(policy.select("b", &handles(&["a", "b", "c"])).unwrap(), "a");
            assert!(policy.select("a", &handles(&["a"])).is_err());
        }

        #[test]
        fn test_default_is_require_single() {
            assert_eq!(NewWindowPolicy::default(), NewWindowPolicy::RequireSingle);
        }
    }

    mod step_tests {
        use super::*;

        #[tokio::test]
        async fn test_open_website() {
            let driver = scripted_login_site(&Site::default(), false);
            let journal = driver.journal().clone();
            let mut session = Session::from_driver(driver);

            let message = open_website(&mut session, &Site::default(), &quick()).await.unwrap();
            assert_eq!(message, "Website opened successfully");
            assert!(session.driver().is_maximized());
            assert!(journal.contains(&format!("navigate:{SITE_URL}")));
            assert_eq!(session.evidence().attachments()[0].name, "website_opened");
            session.close().await.unwrap();
        }

        #[tokio::test]
        async fn test_open_website_times_out_before_assertion() {
            let driver = MockDriver::new().on_navigate(MockEffect::SetTitle("Maintenance".into()));
            let mut session = Session::from_driver(driver);
            let err = open_website(&mut session, &Site::default(), &quick())
                .await
                .unwrap_err();
            assert!(err.is_timeout());
            assert!(session.evidence().attachments().is_empty());
            session.close().await.unwrap();
        }

        #[tokio::test]
        async fn test_verify_title_exact() {
            let mut session = Session::from_driver(MockDriver::new().with_title(EXPECTED_TITLE));
            let message = verify_title(&mut session, EXPECTED_TITLE, &quick()).await.unwrap();
            assert_eq!(message, format!("Title verified: {EXPECTED_TITLE}"));
            session.close().await.unwrap();
        }

        #[tokio::test]
        async fn test_verify_title_superstring_times_out() {
            let title = format!("{EXPECTED_TITLE} (beta)");
            let mut session = Session::from_driver(MockDriver::new().with_title(title));
            let err = verify_title(&mut session, EXPECTED_TITLE, &quick())
                .await
                .unwrap_err();
            assert!(err.is_timeout());
            session.close().await.unwrap();
        }

        #[tokio::test]
        async fn test_verify_title_changed_after_wait_is_mismatch() {
            let driver = MockDriver::new()
                .with_title("Datafortune Performance Accelerator-Prod")
                .with_title_reads([EXPECTED_TITLE]);
            let mut session = Session::from_driver(driver);
            let err = verify_title(&mut session, EXPECTED_TITLE, &quick())
                .await
                .unwrap_err();
            match err {
                FlowError::TitleMismatch { ref expected, ref actual } => {
                    assert_eq!(expected, EXPECTED_TITLE);
                    assert_eq!(actual, "Datafortune Performance Accelerator-Prod");
                }
                ref other => panic!("expected title mismatch, got {other:?}"),
            }
            assert_eq!(err.kind(), crate::error::FailureKind::Assertion);
            assert!(session.evidence().attachments().is_empty());
            session.close().await.unwrap();
        }

        #[tokio::test]
        async fn test_login_button_never_clickable() {
            let driver = MockDriver::new()
                .on_navigate(MockEffect::SetTitle(EXPECTED_TITLE.into()))
                .on_navigate(MockEffect::Show(login_button(), ElementState::DISABLED));
            let journal = driver.journal().clone();
            let mut session = Session::from_driver(driver);

            let err = run_steps(&mut session, 3).await.unwrap_err();
            assert!(err.is_timeout());
            assert!(err.to_string().contains(LOGIN_BUTTON_XPATH));
            assert_eq!(journal.count("switch:"), 0);
            assert_eq!(journal.count("click:"), 0);
            session.close().await.unwrap();
        }

        #[tokio::test]
        async fn test_ambiguous_windows() {
            let driver = MockDriver::new()
                .with_element(login_button(), ElementState::INTERACTABLE)
                .on_click(
                    login_button(),
                    vec![
                        MockEffect::OpenWindow(MockWindow::new("popup-a")),
                        MockEffect::OpenWindow(MockWindow::new("popup-b")),
                    ],
                );

            let mut session = Session::from_driver(driver.clone());
            let err = navigate_to_microsoft_login_page(
                &mut session,
                &quick(),
                NewWindowPolicy::RequireSingle,
            )
            .await
            .unwrap_err();
            assert!(matches!(err, FlowError::AmbiguousWindow { count: 2 }));
            session.close().await.unwrap();

            let mut session = Session::from_driver(driver);
            navigate_to_microsoft_login_page(&mut session, &quick(), NewWindowPolicy::FirstListed)
                .await
                .unwrap();
            assert_eq!(session.driver().current_window().await.unwrap(), "popup-a");
            session.close().await.unwrap();
        }

        #[tokio::test]
        async fn test_username_and_password_are_typed() {
            let mut session = Session::from_driver(scripted_login_site(&Site::default(), false));
            let message = run_steps(&mut session, 4).await.unwrap();
            assert_eq!(message, "Username entered: qa@example.com");
            assert_eq!(
                session.driver().value_of(&username_field()),
                Some("qa@example.com")
            );

            let message = Step::EnterPassword.run(&mut session, &inputs()).await.unwrap();
            assert_eq!(message, "Password entered successfully");
            let names: Vec<&str> = session
                .evidence()
                .attachments()
                .iter()
                .map(|a| a.name.as_str())
                .collect();
            assert_eq!(
                &names[3..],
                ["username_entered", "pre_password_page", "password_entered"]
            );
            session.close().await.unwrap();
        }
    }

    mod otp_tests {
        use super::*;

        #[tokio::test]
        async fn test_full_flow_without_prompt() {
            let mut session = Session::from_driver(scripted_login_site(&Site::default(), false));
            let message = run_steps(&mut session, 6).await.unwrap();
            assert_eq!(message, "OTP 123456 entered and verified");
            assert_eq!(session.driver().value_of(&otp_field()), Some("123456"));
            let names: Vec<&str> = session
                .evidence()
                .attachments()
                .iter()
                .map(|a| a.name.as_str())
                .collect();
            assert!(!names.contains(&"stay_signed_in"));
            assert_eq!(names.last(), Some(&"otp_verified"));
            session.close().await.unwrap();
        }

        #[tokio::test]
        async fn test_full_flow_with_prompt() {
            let mut session = Session::from_driver(scripted_login_site(&Site::default(), true));
            let message = run_steps(&mut session, 6).await.unwrap();
            assert_eq!(message, "OTP 123456 entered and verified");
            assert!(session
                .evidence()
                .attachments()
                .iter()
                .any(|a| a.name == "stay_signed_in"));
            session.close().await.unwrap();
        }

        #[tokio::test]
        async fn test_prompt_outcomes() {
            let mut session = Session::from_driver(
                MockDriver::new().with_element(next_button(), ElementState::INTERACTABLE),
            );
            let outcome = dismiss_stay_signed_in(&mut session, &quick()).await.unwrap();
            assert_eq!(outcome, PromptOutcome::Dismissed);
            session.close().await.unwrap();

            let mut session = Session::from_driver(MockDriver::new());
            let outcome = dismiss_stay_signed_in(&mut session, &quick()).await.unwrap();
            assert_eq!(outcome, PromptOutcome::Absent);
            session.close().await.unwrap();
        }

        #[tokio::test]
        async fn test_prompt_check_on_dead_session_propagates() {
            let mut driver = MockDriver::new();
            driver.close().await.unwrap();
            let mut session = Session::from_driver(driver);

            let err = dismiss_stay_signed_in(&mut session, &quick()).await.unwrap_err();
            assert!(matches!(err, FlowError::Session { .. }));
            assert!(!err.is_timeout());

            let err = enter_otp(&mut session, "123456", &quick()).await.unwrap_err();
            assert!(matches!(err, FlowError::Session { .. }));
        }

        #[tokio::test]
        async fn test_prompt_stale_until_deadline_is_absent() {
            let mut session = Session::from_driver(
                MockDriver::new()
                    .with_element(next_button(), ElementState::INTERACTABLE)
                    .with_stale_probes(1_000),
            );
            let outcome = dismiss_stay_signed_in(&mut session, &quick()).await.unwrap();
            assert_eq!(outcome, PromptOutcome::Absent);
            assert_eq!(session.driver().journal().count("click:"), 0);
            session.close().await.unwrap();
        }

        #[tokio::test]
        async fn test_failing_screenshots_do_not_change_results() {
            let driver = scripted_login_site(&Site::default(), false).with_failing_screenshots();
            let mut session = Session::from_driver(driver);
            let message = run_steps(&mut session, 6).await.unwrap();
            assert_eq!(message, "OTP 123456 entered and verified");
            assert!(session.evidence().attachments().is_empty());
            assert_eq!(session.evidence().failed_captures(), 7);
            session.close().await.unwrap();
        }
    }
}
