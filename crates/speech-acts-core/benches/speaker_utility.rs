use criterion::{Criterion, black_box, criterion_group, criterion_main};
use speech_acts_core::generate::{
    action_context_combinations, actions_from_features, utterances_from_feature_values,
    worlds_from_feature_values,
};
use speech_acts_core::{ActionContext, LiteralListener, RewardVector, Speaker, SpeakerKind};

const COLORS: [&str; 3] = ["blue", "green", "red"];
const SHAPES: [&str; 3] = ["circle", "square", "triangle"];

fn speaker_utility_bench(c: &mut Criterion) {
    let features = [COLORS, SHAPES].concat();
    let worlds = worlds_from_feature_values(&features, &[-2, -1, 1, 2]).expect("worlds");
    let listener = LiteralListener::new(3.0, features.iter().copied(), worlds).expect("listener");
    let w = RewardVector::new(features.iter().enumerate().map(|(i, feature)| {
        let weight = if i % 2 == 0 { 1.0 } else { -2.0 };
        (*feature, weight)
    }));
    let utterances = utterances_from_feature_values(&features, &[-2, -1, 1, 2]);
    let contexts: Vec<ActionContext> =
        action_context_combinations(&actions_from_features(&[COLORS, SHAPES]), 3)
            .into_iter()
            .map(|tuples| ActionContext::from_actions(&tuples).expect("context"))
            .collect();

    let mut group = c.benchmark_group("speaker_utility");
    for kind in SpeakerKind::ALL {
        let speaker = Speaker::new(kind, &listener, 3.0, &w, kind.label()).expect("speaker");
        group.bench_function(format!("{}_all_contexts", kind.label().to_lowercase()), |b| {
            b.iter(|| {
                for context in &contexts {
                    for utterance in &utterances {
                        let _ = black_box(speaker.utility(utterance, context));
                    }
                }
            })
        });
    }
    group.finish();
}

criterion_group!(benches, speaker_utility_bench);
criterion_main!(benches);
