//! End-to-end assessment through the public API with the mock suite.

use sp800_90b_assess::assessment::{
    combine, AssessmentCoordinator, AssessmentError, AssessmentObserver, AssessmentRequest,
    AssessmentResult, ErrorKind, RequestError, TestSelection,
};
use sp800_90b_assess::estimators::{MockSuite, Mode, Representation};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn samples(len: usize) -> Vec<u8> {
    (0..len as u32).map(|i| (i.wrapping_mul(2654435761) >> 24) as u8).collect()
}

fn request(data: &[u8], word_size: u32, run_iid: bool, run_non_iid: bool) -> AssessmentRequest<'_> {
    AssessmentRequest {
        data,
        word_size,
        run_iid,
        run_non_iid,
    }
}

#[derive(Default)]
struct RecordingObserver {
    events: Mutex<Vec<String>>,
}

impl RecordingObserver {
    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl AssessmentObserver for RecordingObserver {
    fn rejected(&self, error: &RequestError) {
        self.events.lock().unwrap().push(format!("rejected:{}", error.reason()));
    }

    fn started(&self, selection: TestSelection, sample_bytes: usize) {
        self.events
            .lock()
            .unwrap()
            .push(format!("started:{}:{}", selection, sample_bytes));
    }

    fn completed(&self, selection: TestSelection, _: &AssessmentResult, _: Duration) {
        self.events.lock().unwrap().push(format!("completed:{}", selection));
    }

    fn failed(&self, selection: TestSelection, error: &AssessmentError, _: Duration) {
        self.events
            .lock()
            .unwrap()
            .push(format!("failed:{}:{}", selection, error.kind()));
    }
}

#[test]
fn combined_min_is_minimum_of_modes() {
    let data = samples(4096);
    let coordinator = AssessmentCoordinator::new(Arc::new(MockSuite::new()));
    let result = coordinator.assess(&request(&data, 8, true, true)).unwrap();

    let iid = result.iid.as_ref().unwrap();
    let non_iid = result.non_iid.as_ref().unwrap();
    assert_eq!(result.min_entropy, iid.h_assessed.min(non_iid.h_assessed));
    assert_eq!(result.sample_count, 4096);
    assert_eq!(result.word_size, 8);
    assert!(result.min_entropy.is_finite());
}

#[test]
fn single_mode_equals_its_assessment() {
    let data = samples(1024);
    let coordinator = AssessmentCoordinator::new(Arc::new(MockSuite::new()));
    let result = coordinator.assess(&request(&data, 0, false, true)).unwrap();
    assert_eq!(result.min_entropy, result.non_iid.as_ref().unwrap().h_assessed);
    assert!(result.iid.is_none());
}

#[test]
fn assessed_entropy_never_exceeds_word_size() {
    let coordinator = AssessmentCoordinator::new(Arc::new(MockSuite::new()));
    for word_size in 1..=8u32 {
        let data = samples(512);
        match coordinator.assess(&request(&data, word_size, true, true)) {
            Ok(result) => {
                for mode in result.modes() {
                    assert!(mode.h_assessed <= f64::from(mode.word_size.bits()));
                }
            }
            Err(e) => assert_eq!(e.kind(), ErrorKind::InvalidInput),
        }
    }
}

#[test]
fn repeated_runs_are_identical() {
    let data = samples(2048);
    let coordinator = AssessmentCoordinator::new(Arc::new(MockSuite::new()));
    let first = coordinator.assess(&request(&data, 0, true, true)).unwrap();
    let second = coordinator.assess(&request(&data, 0, true, true)).unwrap();
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn explicit_width_boundary_scenario() {
    let suite = Arc::new(MockSuite::new());
    let coordinator = AssessmentCoordinator::new(suite.clone());
    let result = coordinator.assess(&request(&[1, 2, 3, 4], 8, true, true)).unwrap();

    assert_eq!(result.iid.as_ref().unwrap().alphabet_size, 4);
    let non_iid = result.non_iid.as_ref().unwrap();
    assert!(non_iid
        .outcomes
        .iter()
        .any(|o| o.representation == Representation::Bitstring));

    let iid_calls: Vec<_> = suite
        .calls()
        .into_iter()
        .filter(|c| c.mode == Mode::Iid)
        .collect();
    assert_eq!(iid_calls.len(), 1);
    assert_eq!(iid_calls[0].representation, Representation::Literal);
}

#[test]
fn suite_without_estimates_reports_ceiling() {
    let coordinator = AssessmentCoordinator::new(Arc::new(MockSuite::without_estimates()));
    let result = coordinator.assess(&request(&samples(256), 8, true, true)).unwrap();
    assert_eq!(result.min_entropy, 8.0);
}

#[test]
fn combine_without_finite_values_reports_zero() {
    let result = combine(6, 0, None, None);
    assert_eq!(result.min_entropy, 0.0);
    assert_eq!(result.word_size, 6);
}

#[test]
fn failure_in_one_mode_fails_assessment() {
    let coordinator = AssessmentCoordinator::new(Arc::new(MockSuite::failing(-1, "invalid data")));
    let err = coordinator.assess(&request(&samples(64), 8, true, true)).unwrap_err();
    assert_eq!(err.mode(), Some(Mode::Iid));
    assert_eq!(err.foreign_code(), Some(-1));
    assert_eq!(err.kind(), ErrorKind::Foreign);
}

#[test]
fn observer_sees_invocation_boundaries() {
    let observer = Arc::new(RecordingObserver::default());
    let coordinator = AssessmentCoordinator::new(Arc::new(MockSuite::new()))
        .with_observer(observer.clone());

    coordinator.assess(&request(&[], 8, true, false)).unwrap_err();
    coordinator.assess(&request(&[1, 2, 3], 8, true, true)).unwrap();
    coordinator.assess(&request(&[7, 7], 8, false, true)).unwrap_err();

    assert_eq!(
        observer.events(),
        vec![
            "rejected:empty_data",
            "started:mixed:3",
            "completed:mixed",
            "started:Non-IID:2",
            "failed:Non-IID:invalid_input",
        ]
    );
}

#[test]
fn concurrent_assessments_are_independent() {
    let coordinator = AssessmentCoordinator::new(Arc::new(MockSuite::new()));
    let expected = coordinator.assess(&request(&samples(1000), 0, true, true)).unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let coordinator = coordinator.clone();
            std::thread::spawn(move || {
                let data = samples(1000);
                coordinator.assess(&request(&data, 0, true, true)).unwrap()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
}
