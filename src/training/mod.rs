// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Training plans: generation, readiness adjustment, loads and progress

pub mod adjustment;
pub mod generator;
pub mod load;
pub mod progress;

pub use adjustment::{adjust_plan, should_supersede};
pub use generator::{attach_research_note, generate_base_plan};
pub use load::{estimate_e1rm, load_for_reps};
pub use progress::{track_progress, ProgressSummary, ProgressTracker, ProgressUpdate};
