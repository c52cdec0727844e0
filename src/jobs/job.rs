// BookBinder - Chaptered audiobook assembly
// Copyright (C) 2025 Henning Berge
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.


//! One chapter encode job
//!
//! A job decodes its input files in order, streams the PCM into a fresh
//! encoder and writes one chapter file named after its position and title.
//! Jobs share nothing with each other.

use crate::audio::decoder::PcmDecoder;
use crate::audio::format::AacFormat;
use crate::binder::Chapter;
use crate::encoder::{AudioEncoder, EncoderKind};
use crate::error::{BinderError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Encode job lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Running,
    Completed,
    Failed,
    Cancelled,
}

/// Encode the inputs of one chapter into a single output file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodeJob {
    /// 1-based chapter position
    pub position: usize,
    pub title: String,
    /// Decoded and concatenated in this order
    pub input_files: Vec<PathBuf>,
    pub output_dir: PathBuf,
    #[serde(default)]
    pub format: AacFormat,
    /// Rename each input to `<input>.done` after it was encoded
    #[serde(default)]
    pub rename_input: bool,
}

/// Outcome of one job, as shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobReport {
    pub position: usize,
    pub title: String,
    pub state: JobState,
    pub output: Option<PathBuf>,
    /// PCM frames consumed by the encoder
    pub sample_count: u64,
    /// `+ <input>` per encoded input, `= <output>` once finished
    pub messages: Vec<String>,
    pub error: Option<String>,
}

impl JobReport {
    fn new(job: &EncodeJob, state: JobState) -> Self {
        Self {
            position: job.position,
            title: job.title.clone(),
            state,
            output: None,
            sample_count: 0,
            messages: Vec::new(),
            error: None,
        }
    }

    pub fn cancelled(job: &EncodeJob) -> Self {
        Self::new(job, JobState::Cancelled)
    }

    pub fn failed(position: usize, title: String, error: String) -> Self {
        Self {
            position,
            title,
            state: JobState::Failed,
            output: None,
            sample_count: 0,
            messages: Vec::new(),
            error: Some(error),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.state == JobState::Completed
    }

    /// Chapter entry for the assembled book
    pub fn chapter(&self) -> Option<Chapter> {
        let output = self.output.as_ref().filter(|_| self.is_completed())?;
        let chapter = Chapter::new(self.title.clone(), output.clone());
        Some(if self.sample_count > 0 {
            chapter.with_sample_count(self.sample_count)
        } else {
            chapter
        })
    }

    fn info(&mut self, message: String) {
        tracing::info!("{}", message);
        self.messages.push(message);
    }
}

impl EncodeJob {
    pub fn new<S: Into<String>>(position: usize, title: S, input_files: Vec<PathBuf>, output_dir: PathBuf) -> Self {
        Self {
            position,
            title: title.into(),
            input_files,
            output_dir,
            format: AacFormat::default(),
            rename_input: false,
        }
    }

    /// `<position:03>_<title>.<suffix>` with the title reduced to `[_0-9a-zA-Z]`
    pub fn output_name(&self, suffix: &str) -> Result<String> {
        let unsafe_chars = Regex::new(r"[^_0-9a-zA-Z]")
            .map_err(|e| BinderError::invalid_input(format!("Invalid file name pattern: {}", e)))?;
        let title = unsafe_chars.replace_all(&self.title, "_");
        Ok(format!("{:03}_{}.{}", self.position, title, suffix))
    }

    pub fn output_path(&self, suffix: &str) -> Result<PathBuf> {
        Ok(self.output_dir.join(self.output_name(suffix)?))
    }

    /// Run the job to completion on the current thread
    pub fn execute(&self, kind: EncoderKind) -> JobReport {
        let mut report = JobReport::new(self, JobState::Running);
        let result = kind.create().and_then(|mut encoder| {
            let output = self.output_path(&encoder.output_suffix(&self.format))?;
            report.output = Some(output.clone());
            let encoded = self.encode_into(encoder.as_mut(), &output, &mut report);
            drop(encoder);
            if encoded.is_err() {
                remove_partial(&output);
            }
            encoded
        });

        match result {
            Ok(sample_count) => {
                report.state = JobState::Completed;
                report.sample_count = sample_count;
            }
            Err(e) => {
                tracing::error!("Chapter #{} \"{}\": {}", self.position, self.title, e);
                report.state = JobState::Failed;
                report.output = None;
                report.error = Some(e.user_message());
            }
        }
        report
    }

    fn encode_into(&self, encoder: &mut dyn AudioEncoder, output: &Path, report: &mut JobReport) -> Result<u64> {
        if self.input_files.is_empty() {
            return Err(BinderError::invalid_input(format!(
                "Chapter #{} \"{}\" has no input files",
                self.position, self.title
            )));
        }
        std::fs::create_dir_all(&self.output_dir)
            .map_err(|e| BinderError::file_io("Failed to create output directory", &self.output_dir, e))?;

        tracing::info!("Writing ADTS file \"{}\"", output.display());
        encoder.initialize(self.format, output)?;

        for input in &self.input_files {
            let mut decoder = PcmDecoder::open(input, self.format)?;
            let info = decoder.info();
            tracing::debug!(
                "Decoding {}: {} channels, {}Hz",
                input.display(),
                info.channels,
                info.sample_rate
            );
            let decoded = decoder.decode_all(|pcm| encoder.encode(pcm))?;
            if let Some(announced) = info.frames.filter(|&n| n != decoded) {
                tracing::warn!(
                    "{} announced {} PCM frames but decoded {}",
                    input.display(),
                    announced,
                    decoded
                );
            }
            report.info(format!("+ {}", input.display()));

            if self.rename_input {
                let mut done = input.as_os_str().to_owned();
                done.push(".done");
                std::fs::rename(input, &done)
                    .map_err(|e| BinderError::file_io("Failed to rename input", input, e))?;
            }
        }

        encoder.flush()?;
        report.info(format!("= {}", output.display()));
        Ok(encoder.num_pcm_frames())
    }
}

/// One chapter entry of a job list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobEntry {
    pub title: String,
    pub inputs: Vec<PathBuf>,
}

/// Job list file: shared output settings plus chapters in book order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobList {
    pub output_dir: PathBuf,
    #[serde(default)]
    pub format: AacFormat,
    #[serde(default)]
    pub encoder: EncoderKind,
    pub chapters: Vec<JobEntry>,
}

impl JobList {
    /// Read a job list; relative paths resolve against the file's directory
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| BinderError::file_io("Failed to read job list", path, e))?;
        let mut list: JobList = serde_json::from_str(&json)?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        list.output_dir = base.join(&list.output_dir);
        for entry in &mut list.chapters {
            for input in &mut entry.inputs {
                *input = base.join(&*input);
            }
        }
        Ok(list)
    }

    /// One job per chapter, positions starting at 1
    pub fn jobs(&self, rename_input: bool) -> Vec<EncodeJob> {
        self.chapters
            .iter()
            .enumerate()
            .map(|(index, entry)| EncodeJob {
                position: index + 1,
                title: entry.title.clone(),
                input_files: entry.inputs.clone(),
                output_dir: self.output_dir.clone(),
                format: self.format,
                rename_input,
            })
            .collect()
    }
}

fn remove_partial(output: &Path) {
    if output.exists() {
        if let Err(e) = std::fs::remove_file(output) {
            tracing::warn!("Failed to remove partial output {}: {}", output.display(), e);
        }
    }
}
