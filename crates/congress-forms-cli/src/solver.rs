use async_trait::async_trait;
use colored::Colorize;
use congress_forms_browser::BrowserDriver;
use congress_forms_core::captcha::{CaptchaChallenge, CaptchaReply, CaptchaSolver};
use tokio::io::{AsyncBufReadExt, BufReader};

/// Asks the person at the terminal. An empty line cancels.
pub struct StdinSolver;

#[async_trait]
impl CaptchaSolver for StdinSolver {
    async fn solve(&self, challenge: &CaptchaChallenge, _session: &dyn BrowserDriver) -> CaptchaReply {
        eprintln!(
            "{} {} (step {})",
            "Captcha:".yellow().bold(),
            challenge.image_url,
            challenge.resume_token()
        );
        eprint!("Solution (empty to cancel): ");

        let mut line = String::new();
        let mut reader = BufReader::new(tokio::io::stdin());
        match reader.read_line(&mut line).await {
            Ok(0) | Err(_) => CaptchaReply::Cancel,
            Ok(_) => match line.trim() {
                "" => CaptchaReply::Cancel,
                solution => CaptchaReply::Solution(solution.to_string()),
            },
        }
    }
}
