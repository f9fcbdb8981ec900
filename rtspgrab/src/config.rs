/*!
    Run configuration.

    A run is described by an optional YAML file; command line flags override
    whatever the file sets. Every field has a default, so a file only needs
    the keys it changes:

    ```yaml
    url: rtsp://camera.local:554/stream1
    session:
      transport_mode: reliable
      io_timeout_micros: 5000000
      frame_skip_policy: non-key-only
    output:
      path: latest.png
      format: rgb24
    max_frames: 100
    ```
*/

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow, bail};
use serde::{Deserialize, Serialize};

use ffmpeg_decode::DecoderOptions;
use ffmpeg_types::{PixelFormat, SessionOptions};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub url: Option<String>,
    pub session: SessionOptions,
    pub decoder: DecoderConfig,
    pub output: OutputConfig,
    /// Stop after this many frames have been written.
    pub max_frames: Option<u64>,
    /// Print FFmpeg's description of the input before decoding.
    pub dump_format: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    pub reorder_depth: usize,
}

/**
    Where and how converted frames are written.
*/
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Image overwritten with every frame. The extension picks the encoding.
    pub path: PathBuf,
    /// When set, frames go to numbered files in this directory instead.
    pub sequence_dir: Option<PathBuf>,
    pub sequence_prefix: String,
    pub sequence_extension: String,
    pub format: PixelFormat,
    /// Output size; 0 keeps the decoded size.
    pub width: u32,
    pub height: u32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("frame.jpg"),
            sequence_dir: None,
            sequence_prefix: "frame".to_string(),
            sequence_extension: "jpg".to_string(),
            format: PixelFormat::Bgr24,
            width: 0,
            height: 0,
        }
    }
}

impl Config {
    /**
        Parse a configuration from YAML text.
    */
    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).map_err(|e| anyhow!("Failed to parse config: {}", e))
    }

    /**
        Read and parse a YAML configuration file.
    */
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to read config {}: {}", path.display(), e))?;
        Self::from_yaml(&text).map_err(|e| anyhow!("{}: {}", path.display(), e))
    }

    /**
        Check that the configuration can drive a run and return the locator.
    */
    pub fn validate(&self) -> Result<&str> {
        let Some(url) = self.url.as_deref() else {
            bail!("No stream locator given, pass a URL or set `url` in the config file");
        };
        if !self.output.format.is_raster() {
            bail!(
                "Output format {} is not a 3-byte-per-pixel format, use bgr24 or rgb24",
                self.output.format
            );
        }
        if (self.output.width == 0) != (self.output.height == 0) {
            bail!(
                "Output size {}x{} must set both dimensions or neither",
                self.output.width,
                self.output.height
            );
        }
        if self.max_frames == Some(0) {
            bail!("max_frames must be at least 1");
        }
        Ok(url)
    }

    pub fn decoder_options(&self) -> DecoderOptions {
        DecoderOptions::from(&self.session).with_reorder_depth(self.decoder.reorder_depth)
    }
}
