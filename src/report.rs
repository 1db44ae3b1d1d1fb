//! Single-mode assessment report for the CLI.
//!
//! A report is written as JSON (to a file or stdout) or rendered as text.
//! Failed assessments still produce a report with `error_code` set.

use crate::assessment::{AssessmentError, AssessmentResult, RecordedOutcome};
use crate::estimators::{Mode, Representation};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt::Write as _;

/// Machine-readable result of one CLI assessment.
#[derive(Debug, Clone, Serialize)]
pub struct AssessmentReport {
    /// Tool version.
    pub version: String,
    /// Input file, or `-` for stdin.
    pub filename: String,
    /// `IID` or `Non-IID`.
    pub test_type: String,
    /// Word size as requested (0 = auto-detect).
    pub bits_per_symbol: u32,
    /// Word size actually used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub word_size: Option<u8>,
    /// Number of input bytes.
    pub data_size: usize,
    /// Hex SHA-256 of the input.
    pub sample_sha256: String,
    /// When the assessment ran.
    pub assessed_at: DateTime<Utc>,
    /// Combined min-entropy in bits per sample.
    pub min_entropy: f64,
    /// Literal minimum, when successful.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub h_original: Option<f64>,
    /// Bitstring minimum, when the bitstring was assessed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub h_bitstring: Option<f64>,
    /// Assessed entropy for the mode.
    pub h_assessed: f64,
    /// Per-estimator breakdown.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub estimators: Vec<RecordedOutcome>,
    /// 0 on success, 1 on failure.
    pub error_code: i32,
    /// Failure description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl AssessmentReport {
    /// Starts a report for `data` assessed in `mode`.
    pub fn new(filename: impl Into<String>, mode: Mode, bits_per_symbol: u32, data: &[u8]) -> Self {
        Self {
            version: crate::VERSION.to_string(),
            filename: filename.into(),
            test_type: mode.as_str().to_string(),
            bits_per_symbol,
            word_size: None,
            data_size: data.len(),
            sample_sha256: hex_digest(data),
            assessed_at: Utc::now(),
            min_entropy: 0.0,
            h_original: None,
            h_bitstring: None,
            h_assessed: 0.0,
            estimators: Vec::new(),
            error_code: 0,
            error_message: None,
        }
    }

    /// Fills in the figures from a completed assessment.
    pub fn with_result(mut self, result: &AssessmentResult) -> Self {
        self.min_entropy = result.min_entropy;
        self.word_size = Some(result.word_size);
        if let Some(mode) = result.modes().next() {
            let bitstring_ran = mode
                .outcomes
                .iter()
                .any(|o| o.representation == Representation::Bitstring);
            self.h_original = Some(mode.h_original);
            self.h_bitstring = bitstring_ran.then_some(mode.h_bitstring);
            self.h_assessed = mode.h_assessed;
            self.estimators = mode.outcomes.clone();
        }
        self
    }

    /// Marks the report as failed.
    pub fn with_error(mut self, error: &AssessmentError) -> Self {
        self.error_code = 1;
        self.error_message = Some(error.to_string());
        self
    }

    /// Whether the assessment succeeded.
    pub fn is_success(&self) -> bool {
        self.error_code == 0
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Human-readable summary. Verbosity 2 and above lists every estimator.
    pub fn render_text(&self, verbose: u8) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "\nEntropy Assessment Results:");
        let _ = writeln!(out, "  Test Type:       {}", self.test_type);
        let _ = writeln!(
            out,
            "  Bits/Symbol:     {}",
            self.word_size.map(u32::from).unwrap_or(self.bits_per_symbol)
        );
        let _ = writeln!(out, "  Samples:         {}", self.data_size);
        let _ = writeln!(out, "  SHA-256:         {}", self.sample_sha256);
        if let Some(h) = self.h_original {
            let _ = writeln!(out, "  H_original:      {:.6}", h);
        }
        if let Some(h) = self.h_bitstring {
            let _ = writeln!(out, "  H_bitstring:     {:.6}", h);
        }
        let _ = writeln!(out, "  H_assessed:      {:.6}", self.h_assessed);
        let _ = writeln!(out, "  Min Entropy:     {:.6}", self.min_entropy);

        if verbose >= 2 && !self.estimators.is_empty() {
            let _ = writeln!(out, "\nEstimators:");
            for e in &self.estimators {
                let estimate = e
                    .outcome
                    .entropy_estimate
                    .map(|h| format!("{:.6}", h))
                    .unwrap_or_else(|| "-".to_string());
                let verdict = if e.outcome.passed { "pass" } else { "FAIL" };
                let _ = writeln!(
                    out,
                    "  [{:<9}] {:<40} {:>10}  {}",
                    e.representation.as_str(),
                    e.outcome.name,
                    estimate,
                    verdict
                );
            }
        }
        out
    }
}

fn hex_digest(data: &[u8]) -> String {
    Sha256::digest(data)
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assessment::{AssessmentCoordinator, AssessmentRequest};
    use crate::estimators::MockSuite;
    use std::sync::Arc;

    fn assess(data: &[u8], mode: Mode) -> Result<AssessmentResult, AssessmentError> {
        AssessmentCoordinator::new(Arc::new(MockSuite::new())).assess(&AssessmentRequest {
            data,
            word_size: 8,
            run_iid: mode == Mode::Iid,
            run_non_iid: mode == Mode::NonIid,
        })
    }

    #[test]
    fn test_digest_of_empty_input() {
        assert_eq!(
            hex_digest(&[]),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_success_report() {
        let data = [1u8, 2, 3, 4, 1, 2];
        let result = assess(&data, Mode::NonIid).unwrap();
        let report = AssessmentReport::new("data.bin", Mode::NonIid, 8, &data).with_result(&result);

        assert!(report.is_success());
        assert_eq!(report.word_size, Some(8));
        assert!(report.h_bitstring.is_some());
        assert_eq!(report.min_entropy, result.min_entropy);

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["test_type"], "Non-IID");
        assert_eq!(json["error_code"], 0);
        assert!(json.get("error_message").is_none());
        assert_eq!(json["estimators"][0]["representation"], "bitstring");
    }

    #[test]
    fn test_iid_report_has_no_bitstring() {
        let data = [1u8, 2, 3, 4];
        let result = assess(&data, Mode::Iid).unwrap();
        let report = AssessmentReport::new("-", Mode::Iid, 8, &data).with_result(&result);
        assert!(report.h_bitstring.is_none());
        assert!(!report.render_text(1).contains("H_bitstring"));
    }

    #[test]
    fn test_error_report() {
        let data = [5u8; 4];
        let err = assess(&data, Mode::Iid).unwrap_err();
        let report = AssessmentReport::new("const.bin", Mode::Iid, 8, &data).with_error(&err);

        assert!(!report.is_success());
        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["error_code"], 1);
        assert!(json["error_message"]
            .as_str()
            .unwrap()
            .contains("Symbol alphabet consists of 1 symbol"));
    }

    #[test]
    fn test_text_rendering() {
        let data = [1u8, 2, 3, 4];
        let result = assess(&data, Mode::NonIid).unwrap();
        let report = AssessmentReport::new("data.bin", Mode::NonIid, 0, &data).with_result(&result);

        let brief = report.render_text(1);
        assert!(brief.contains("Entropy Assessment Results:"));
        assert!(brief.contains("Bits/Symbol:     8"));
        assert!(!brief.contains("Estimators:"));

        let detailed = report.render_text(2);
        assert!(detailed.contains("Estimators:"));
        assert!(detailed.contains("LZ78Y Test"));
    }
}
