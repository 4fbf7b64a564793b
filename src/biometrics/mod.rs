// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Biometric analysis: nightly readiness and longer-term trends

pub mod history;
pub mod readiness;

pub use history::{analyze_trends, TrendConfidence, TrendData, TrendDirection};
pub use readiness::{
    calculate_readiness, BiometricSnapshot, DataCompleteness, ReadinessAssessment,
    ReadinessCategory, ReadinessComponents,
};
