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


//! Per-chapter encode jobs
//!
//! - `EncodeJob` - inputs, title and position of one chapter
//! - `JobList` - JSON job file with shared output settings
//! - `JobRunner` - bounded concurrent execution with cancellation
//! - `binder_from_reports()` - turn finished jobs into a chapter list
//!
//! Assembly starts only after every job has completed.

pub mod job;
pub mod runner;

pub use job::{EncodeJob, JobEntry, JobList, JobReport, JobState};
pub use runner::{binder_from_reports, CancelHandle, JobRunner, ReportCallback};
