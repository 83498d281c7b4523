//! Encoding options and the encoder command line.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::EncoderError;
use crate::DEFAULT_PROGRAM;

/// x264 speed preset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Preset {
    Ultrafast,
    Superfast,
    #[default]
    Veryfast,
    Faster,
    Fast,
    Medium,
    Slow,
    Slower,
    Veryslow,
}

impl Preset {
    /// All presets, fastest first.
    pub const ALL: [Preset; 9] = [
        Preset::Ultrafast,
        Preset::Superfast,
        Preset::Veryfast,
        Preset::Faster,
        Preset::Fast,
        Preset::Medium,
        Preset::Slow,
        Preset::Slower,
        Preset::Veryslow,
    ];

    /// Name as passed to `-preset`.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ultrafast => "ultrafast",
            Self::Superfast => "superfast",
            Self::Veryfast => "veryfast",
            Self::Faster => "faster",
            Self::Fast => "fast",
            Self::Medium => "medium",
            Self::Slow => "slow",
            Self::Slower => "slower",
            Self::Veryslow => "veryslow",
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Preset {
    type Err = EncoderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|p| p.name() == wanted)
            .ok_or_else(|| EncoderError::InvalidOption(format!("unknown preset '{s}'")))
    }
}

/// How the encoder transcodes and pushes the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodingOptions {
    /// Encoder executable.
    pub program: PathBuf,

    /// Video codec (`-c:v`).
    pub video_codec: String,

    /// Speed preset (`-preset`).
    pub preset: Preset,

    /// Maximum video bitrate (`-maxrate`).
    pub maxrate: String,

    /// Rate control buffer size (`-bufsize`).
    pub bufsize: String,

    /// Audio codec (`-c:a`).
    pub audio_codec: String,

    /// Audio bitrate (`-b:a`).
    pub audio_bitrate: String,

    /// Loop the input indefinitely.
    pub loop_input: bool,
}

impl Default for EncodingOptions {
    fn default() -> Self {
        Self {
            program: PathBuf::from(DEFAULT_PROGRAM),
            video_codec: "libx264".to_string(),
            preset: Preset::default(),
            maxrate: "3000k".to_string(),
            bufsize: "6000k".to_string(),
            audio_codec: "aac".to_string(),
            audio_bitrate: "128k".to_string(),
            loop_input: true,
        }
    }
}

impl EncodingOptions {
    /// Arguments for one run, excluding the program itself.
    ///
    /// Reads at native rate, optionally loops, normalises the pixel format
    /// and pushes FLV to `ingest_url`, which is always last.
    pub fn build_args(&self, input: &Path, ingest_url: &str) -> Vec<OsString> {
        let mut args = vec![OsString::from("-re")];

        if self.loop_input {
            args.push(OsString::from("-stream_loop"));
            args.push(OsString::from("-1"));
        }

        args.push(OsString::from("-i"));
        args.push(input.as_os_str().to_owned());

        let rest: [&str; 19] = [
            "-c:v",
            self.video_codec.as_str(),
            "-preset",
            self.preset.name(),
            "-maxrate",
            self.maxrate.as_str(),
            "-bufsize",
            self.bufsize.as_str(),
            "-vf",
            "format=yuv420p",
            "-pix_fmt",
            "yuv420p",
            "-c:a",
            self.audio_codec.as_str(),
            "-b:a",
            self.audio_bitrate.as_str(),
            "-f",
            "flv",
            ingest_url,
        ];
        args.extend(rest.into_iter().map(OsString::from));

        args
    }

    /// Full command line for display.
    pub fn command_line(&self, input: &Path, ingest_url: &str) -> String {
        std::iter::once(self.program.as_os_str().to_owned())
            .chain(self.build_args(input, ingest_url))
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
