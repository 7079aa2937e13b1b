//! Property tests for probability bounds and labeling

mod common;

use common::ConstantScore;
use proptest::prelude::*;
use reviewsense_core::Label;
use reviewsense_inference::{
    adapt, ActivePredictor, InferenceService, Instance, LexiconFallback, Manifest, Policy,
};

fn review_text() -> impl Strategy<Value = String> {
    let words = prop::sample::select(vec![
        "love", "great", "not worth", "fell apart", "too small", "bad", "badge", "fine", "ok",
        "returned it", "happy", "the", "shoes", "",
    ]);
    prop::collection::vec(words, 0..12).prop_map(|words| words.join(" "))
}

proptest! {
    #[test]
    fn adjusted_probability_is_clamped(
        raw in prop::num::f64::ANY,
        delta in prop::num::f64::ANY,
        threshold in prop::num::f64::ANY,
        text in review_text(),
    ) {
        let policy = Policy::from_manifest(&Manifest {
            threshold: Some(threshold),
            heuristic_delta: Some(delta),
            ..Default::default()
        });

        let adjusted = policy.adjust(&text, raw);
        prop_assert!((0.0..=1.0).contains(&adjusted));
        prop_assert!((0.0..=1.0).contains(&policy.threshold()));
    }

    #[test]
    fn service_results_are_bounded_and_consistent(
        score in -1.0e6f64..1.0e6,
        threshold in 0.0f64..=1.0,
        text in review_text(),
    ) {
        let adapted = adapt(Instance::Score(Box::new(ConstantScore(score)))).unwrap();
        let policy = Policy::from_manifest(&Manifest {
            threshold: Some(threshold),
            ..Default::default()
        });
        let service = InferenceService::with_predictor(ActivePredictor::Model(adapted.handle), policy);

        let result = service.classify(&text);
        prop_assert!((0.0..=1.0).contains(&result.prob));
        prop_assert!((0.0..=1.0).contains(&result.prob_raw));
        prop_assert!(result.prob <= result.prob_raw);
        prop_assert_eq!(result.label == Label::Positive, result.prob >= result.threshold);
    }

    #[test]
    fn fallback_stays_inside_unit_interval(text in ".{0,200}") {
        let p = LexiconFallback::new().probability(&text);
        prop_assert!(p > 0.0 && p < 1.0);
    }
}
