//! Captcha capture and the human solving hand-off.
//!
//! A captcha is captured by screenshotting the page into a scratch file,
//! cropping it to the captcha's rectangle and handing the crop to an
//! [`ImageStore`]. Scratch files are [`NamedTempFile`]s, so they are removed
//! on every exit path.

use crate::error::{FillError, FillResult};
use crate::images::{ImageKind, ImageStore};
use crate::models::ActionStep;
use async_trait::async_trait;
use congress_forms_browser::{BrowserDriver, quote_attr};
use image::ImageFormat;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Rectangle in page pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CaptchaRegion {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl CaptchaRegion {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Parse the object returned by [`bounding_rect_script`]; `None` for null.
    pub fn from_rect(value: &Value) -> Option<Self> {
        let field = |name: &str| value.get(name).and_then(Value::as_f64);
        Some(Self {
            left: field("left")?,
            top: field("top")?,
            width: field("width")?,
            height: field("height")?,
        })
    }

    /// Integer crop box clamped to an image of `image_width` x `image_height`.
    pub fn clamp_to(&self, image_width: u32, image_height: u32) -> Option<(u32, u32, u32, u32)> {
        let x = (self.left.max(0.0).round() as u32).min(image_width);
        let y = (self.top.max(0.0).round() as u32).min(image_height);
        let right = ((self.left + self.width).round().max(0.0) as u32).min(image_width);
        let bottom = ((self.top + self.height).round().max(0.0) as u32).min(image_height);
        (right > x && bottom > y).then(|| (x, y, right - x, bottom - y))
    }
}

/// Script returning the bounding rectangle of `selector`, or null.
pub fn bounding_rect_script(selector: &str) -> String {
    format!(
        "var el = document.querySelector(\"{}\"); \
         if (!el) {{ return null; }} \
         var r = el.getBoundingClientRect(); \
         return {{ left: r.left, top: r.top, width: r.width, height: r.height }};",
        quote_attr(selector)
    )
}

/// Handed to the solver when a script reaches its captcha step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaptchaChallenge {
    pub bioguide_id: String,
    pub image_url: String,
    /// The interrupted step; its id is the resumption token.
    pub step: ActionStep,
}

impl CaptchaChallenge {
    pub fn resume_token(&self) -> u64 {
        self.step.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptchaReply {
    Solution(String),
    /// Stop the script here; the page is classified as it stands.
    Cancel,
}

/// Human (or service) that reads captcha images.
#[async_trait]
pub trait CaptchaSolver: Send + Sync {
    async fn solve(&self, challenge: &CaptchaChallenge, session: &dyn BrowserDriver) -> CaptchaReply;
}

/// Screenshot capture into scratch files.
#[derive(Debug, Clone, Default)]
pub struct CaptchaCapture {
    scratch_dir: Option<PathBuf>,
}

impl CaptchaCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create scratch files in `dir` instead of the system temp directory.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            scratch_dir: Some(dir.into()),
        }
    }

    fn scratch_file(&self, prefix: &str) -> FillResult<NamedTempFile> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(prefix).suffix(".png");
        let file = match &self.scratch_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        Ok(file)
    }

    /// Resolve the captcha rectangle: the override if given, else the live
    /// bounding rectangle of `captcha_selector`.
    pub async fn locate(
        &self,
        driver: &dyn BrowserDriver,
        region_override: Option<CaptchaRegion>,
        captcha_selector: Option<&str>,
    ) -> FillResult<CaptchaRegion> {
        if let Some(region) = region_override {
            debug!(?region, "Using captcha region override");
            return Ok(region);
        }
        let selector = captcha_selector
            .ok_or_else(|| FillError::Capture("no captcha_selector and no region override".to_string()))?;
        let rect = driver.evaluate(&bounding_rect_script(selector)).await?;
        CaptchaRegion::from_rect(&rect).ok_or_else(|| FillError::ElementNotFound(selector.to_string()))
    }

    /// Capture `region` of the page and return the stored image URL.
    pub async fn capture_region(
        &self,
        driver: &dyn BrowserDriver,
        images: &dyn ImageStore,
        region: CaptchaRegion,
    ) -> FillResult<String> {
        let scratch = self.scratch_file("captcha-")?;
        driver.screenshot(scratch.path()).await?;
        crop_in_place(scratch.path().to_path_buf(), region).await?;

        let url = images
            .store(scratch.path(), ImageKind::Captcha)
            .await
            .map_err(|e| FillError::Capture(format!("failed to store captcha: {e:#}")))?;
        info!(url = %url, "Captcha captured");
        Ok(url)
    }

    /// Store a screenshot of the whole page.
    pub async fn capture_page(
        &self,
        driver: &dyn BrowserDriver,
        images: &dyn ImageStore,
    ) -> FillResult<String> {
        let scratch = self.scratch_file("screenshot-")?;
        driver.full_page_screenshot(scratch.path()).await?;
        images
            .store(scratch.path(), ImageKind::Screenshot)
            .await
            .map_err(|e| FillError::Capture(format!("failed to store screenshot: {e:#}")))
    }
}

async fn crop_in_place(path: PathBuf, region: CaptchaRegion) -> FillResult<()> {
    tokio::task::spawn_blocking(move || crop_file(&path, region))
        .await
        .map_err(|e| FillError::Capture(format!("crop task failed: {e}")))?
}

fn crop_file(path: &Path, region: CaptchaRegion) -> FillResult<()> {
    let screenshot = image::open(path)
        .map_err(|e| FillError::Capture(format!("unreadable screenshot: {e}")))?;
    let (x, y, width, height) = region
        .clamp_to(screenshot.width(), screenshot.height())
        .ok_or_else(|| FillError::Capture(format!("captcha region {region:?} is outside the page")))?;
    screenshot
        .crop_imm(x, y, width, height)
        .save_with_format(path, ImageFormat::Png)
        .map_err(|e| FillError::Capture(format!("failed to write crop: {e}")))
}
