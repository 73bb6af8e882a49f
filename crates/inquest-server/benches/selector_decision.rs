use criterion::{Criterion, black_box, criterion_group, criterion_main};
use inquest_bot::Quizmaster;
use inquest_core::config::EngineConfig;
use inquest_core::model::{AnswerGrade, Catalog, SyntheticSpec};

fn bench_opening_turn(catalog: &Catalog) {
    let mut master = Quizmaster::new(EngineConfig::default());
    let _ = black_box(master.begin(catalog));
}

fn bench_answered_turn(catalog: &Catalog) {
    let mut master = Quizmaster::new(EngineConfig::default());
    let (mut session, report) = master.begin(catalog);
    if let Some(question) = report.question {
        let idx = catalog.index_of_question(&question.id).unwrap();
        let _ = black_box(master.answer(
            catalog,
            &mut session,
            idx,
            AnswerGrade::ProbablyYes,
        ));
    }
}

fn selector_decision_bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("selector_decision");
    for (characters, traits) in [(16usize, 24usize), (64, 48), (128, 64)] {
        let catalog = Catalog::synthetic(SyntheticSpec { characters, traits }, 7).unwrap();
        group.bench_function(format!("open_{}x{}", characters, traits), |b| {
            b.iter(|| bench_opening_turn(&catalog))
        });
        group.bench_function(format!("answer_{}x{}", characters, traits), |b| {
            b.iter(|| bench_answered_turn(&catalog))
        });
    }
    group.finish();
}

criterion_group!(benches, selector_decision_bench);
criterion_main!(benches);
