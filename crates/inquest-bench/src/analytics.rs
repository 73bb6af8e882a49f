use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use plotters::prelude::*;
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, Normal};
use thiserror::Error;

use crate::arena::GameOutcome;
use crate::config::{EvalConfig, SelectorKind};

const CONFIDENCE_Z: f64 = 1.96; // 95% CI

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("baseline agent '{0}' not present in evaluation results")]
    MissingBaseline(String),
    #[error("agent '{0}' produced results but is missing from configuration")]
    UnknownAgent(String),
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to render plot: {0}")]
    Plot(String),
}

pub struct AnalyticsCollector {
    baseline: String,
    agents: HashMap<String, AgentAccumulator>,
    agent_order: Vec<String>,
}

impl AnalyticsCollector {
    pub fn new(config: &EvalConfig) -> Result<Self, AnalyticsError> {
        let baseline = config
            .metrics
            .baseline
            .clone()
            .ok_or_else(|| AnalyticsError::MissingBaseline("<unset>".into()))?;

        let mut agents = HashMap::new();
        let mut order = Vec::new();
        for agent in &config.agents {
            agents.insert(
                agent.name.clone(),
                AgentAccumulator::new(agent.name.clone(), agent.selector),
            );
            order.push(agent.name.clone());
        }

        Ok(Self {
            baseline,
            agents,
            agent_order: order,
        })
    }

    pub fn record_game(&mut self, agent: &str, outcome: &GameOutcome) -> Result<(), AnalyticsError> {
        let acc = self
            .agents
            .get_mut(agent)
            .ok_or_else(|| AnalyticsError::UnknownAgent(agent.to_string()))?;
        acc.record_game(outcome);
        Ok(())
    }

    pub fn finalize(mut self) -> Result<AnalyticsSummary, AnalyticsError> {
        let mut reports = Vec::new();
        for name in &self.agent_order {
            if let Some(acc) = self.agents.remove(name) {
                reports.push(acc.into_report());
            }
        }

        let baseline = reports
            .iter()
            .find(|report| report.name == self.baseline)
            .cloned()
            .ok_or_else(|| AnalyticsError::MissingBaseline(self.baseline.clone()))?;

        let comparisons = reports
            .iter()
            .map(|report| {
                let p_value = if report.name == baseline.name {
                    1.0
                } else {
                    two_proportion_p_value(
                        report.solved,
                        report.games,
                        baseline.solved,
                        baseline.games,
                    )
                };
                ComparisonReport {
                    agent: report.name.clone(),
                    p_value,
                    sample_size: report.games,
                }
            })
            .collect();

        Ok(AnalyticsSummary {
            baseline: self.baseline,
            agents: reports,
            comparisons,
        }
        .enrich())
    }
}

struct AgentAccumulator {
    name: String,
    selector: SelectorKind,
    games: usize,
    solved: usize,
    wrong_guesses: u64,
    learned_games: usize,
    solved_questions: u64,
    questions_histogram: HashMap<usize, usize>,
}

impl AgentAccumulator {
    fn new(name: String, selector: SelectorKind) -> Self {
        Self {
            name,
            selector,
            games: 0,
            solved: 0,
            wrong_guesses: 0,
            learned_games: 0,
            solved_questions: 0,
            questions_histogram: HashMap::new(),
        }
    }

    fn record_game(&mut self, outcome: &GameOutcome) {
        self.games += 1;
        self.wrong_guesses += outcome.wrong_guesses as u64;
        if outcome.solved {
            self.solved += 1;
            self.solved_questions += outcome.questions as u64;
        }
        if outcome.learned {
            self.learned_games += 1;
        }
        *self.questions_histogram.entry(outcome.questions).or_insert(0) += 1;
    }

    fn into_report(self) -> AgentReport {
        let success_rate = if self.games == 0 {
            0.0
        } else {
            self.solved as f64 / self.games as f64
        };
        let mean_questions_solved = if self.solved == 0 {
            None
        } else {
            Some(self.solved_questions as f64 / self.solved as f64)
        };

        AgentReport {
            name: self.name,
            selector: self.selector,
            games: self.games,
            solved: self.solved,
            success_rate,
            ci95: wilson_interval(self.solved, self.games),
            mean_questions_solved,
            wrong_guesses: self.wrong_guesses,
            learned_games: self.learned_games,
            questions_histogram: self.questions_histogram,
            delta_vs_baseline: 0.0, // Filled later once we know baseline report
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AnalyticsSummary {
    pub baseline: String,
    pub agents: Vec<AgentReport>,
    pub comparisons: Vec<ComparisonReport>,
}

impl AnalyticsSummary {
    pub fn enrich(mut self) -> Self {
        let baseline_rate = self
            .agents
            .iter()
            .find(|agent| agent.name == self.baseline)
            .map(|agent| agent.success_rate)
            .unwrap_or(0.0);

        for agent in &mut self.agents {
            agent.delta_vs_baseline = agent.success_rate - baseline_rate;
        }

        self
    }

    pub fn write_markdown(&self, path: impl AsRef<Path>) -> Result<(), AnalyticsError> {
        let mut rows = String::new();
        rows.push_str("# Evaluation Summary\n\n");
        rows.push_str(&format!("Baseline agent: `{}`\n\n", self.baseline));
        rows.push_str("| Agent | Selector | Games | Solved % | Δ vs baseline | Wilson 95% CI | Avg Qs (solved) | Wrong guesses | Learned games | p-value |\n");
        rows.push_str("|-------|----------|-------|----------|----------------|---------------|------------------|----------------|----------------|---------|\n");

        for agent in &self.agents {
            let comparison = self
                .comparisons
                .iter()
                .find(|c| c.agent == agent.name)
                .map(|c| c.p_value)
                .unwrap_or(1.0);
            let avg_questions = agent
                .mean_questions_solved
                .map(|mean| format!("{mean:.2}"))
                .unwrap_or_else(|| "-".to_string());

            rows.push_str(&format!(
                "| {name} | {selector:?} | {games} | {rate:.1}% | {delta:+.1}% | [{ci_low:.1}%, {ci_high:.1}%] | {avg} | {wrong} | {learned} | {pval:.3} |\n",
                name = agent.name,
                selector = agent.selector,
                games = agent.games,
                rate = agent.success_rate * 100.0,
                delta = agent.delta_vs_baseline * 100.0,
                ci_low = agent.ci95.0 * 100.0,
                ci_high = agent.ci95.1 * 100.0,
                avg = avg_questions,
                wrong = agent.wrong_guesses,
                learned = agent.learned_games,
                pval = comparison,
            ));
        }

        fs::write(path.as_ref(), rows).map_err(|e| AnalyticsError::Io {
            context: "writing summary markdown",
            source: e,
        })?;
        Ok(())
    }

    /// Questions-per-game histogram, one bar cluster per question count.
    pub fn render_plot(&self, dir: impl AsRef<Path>) -> Result<PathBuf, AnalyticsError> {
        let dir = dir.as_ref();
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir).map_err(|e| AnalyticsError::Io {
                context: "creating plots directory",
                source: e,
            })?;
        }

        let output_path = dir.join("questions_hist.png");
        let agents_snapshot = self.agents.clone();

        let prev_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(|_| {}));

        let plot_attempt = std::panic::catch_unwind(move || {
            let root = BitMapBackend::new(&output_path, (800, 480)).into_drawing_area();
            root.fill(&WHITE)
                .map_err(|e| AnalyticsError::Plot(e.to_string()))?;

            let max_questions = agents_snapshot
                .iter()
                .flat_map(|agent| agent.questions_histogram.keys().copied())
                .max()
                .unwrap_or(0);
            let max_count = agents_snapshot
                .iter()
                .flat_map(|agent| agent.questions_histogram.values().copied())
                .max()
                .unwrap_or(0);

            let mut chart = ChartBuilder::on(&root)
                .margin(20)
                .caption("Questions per game", ("sans-serif", 22))
                .set_label_area_size(LabelAreaPosition::Left, 50)
                .set_label_area_size(LabelAreaPosition::Bottom, 60)
                .build_cartesian_2d(0..(max_questions + 2), 0..(max_count + 1))
                .map_err(|e| AnalyticsError::Plot(e.to_string()))?;

            chart
                .configure_mesh()
                .disable_mesh()
                .y_desc("Games")
                .x_desc("Questions asked")
                .draw()
                .map_err(|e| AnalyticsError::Plot(e.to_string()))?;

            let palette = [&BLUE, &GREEN, &RED, &MAGENTA, &CYAN, &BLACK];
            for (idx, agent) in agents_snapshot.iter().enumerate() {
                let color = palette[idx % palette.len()];
                chart
                    .draw_series(
                        agent
                            .questions_histogram
                            .iter()
                            .map(|(&questions, &count)| {
                                Circle::new((questions, count), 4, color.filled())
                            }),
                    )
                    .map_err(|e| AnalyticsError::Plot(e.to_string()))?
                    .label(agent.name.clone())
                    .legend(move |(x, y)| Circle::new((x, y), 4, color.filled()));
            }

            chart
                .configure_series_labels()
                .border_style(BLACK)
                .background_style(WHITE.mix(0.8))
                .draw()
                .map_err(|e| AnalyticsError::Plot(e.to_string()))?;

            drop(chart);

            root.present()
                .map_err(|e| AnalyticsError::Plot(e.to_string()))?;

            drop(root);

            Ok(output_path)
        });

        std::panic::set_hook(prev_hook);

        match plot_attempt {
            Ok(result) => result,
            Err(_) => Err(AnalyticsError::Plot(
                "plotters panicked while rendering (missing font support?)".into(),
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentReport {
    pub name: String,
    pub selector: SelectorKind,
    pub games: usize,
    pub solved: usize,
    pub success_rate: f64,
    pub ci95: (f64, f64),
    /// Mean questions over solved games only; `None` when nothing solved.
    pub mean_questions_solved: Option<f64>,
    pub wrong_guesses: u64,
    pub learned_games: usize,
    #[serde(skip)]
    pub questions_histogram: HashMap<usize, usize>,
    #[serde(skip)]
    pub delta_vs_baseline: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComparisonReport {
    pub agent: String,
    pub p_value: f64,
    pub sample_size: usize,
}

/// Wilson score interval for a binomial success rate.
fn wilson_interval(successes: usize, trials: usize) -> (f64, f64) {
    if trials == 0 {
        return (0.0, 0.0);
    }
    let n = trials as f64;
    let p = successes as f64 / n;
    let z = CONFIDENCE_Z;
    let z2 = z * z;

    let denom = 1.0 + z2 / n;
    let center = (p + z2 / (2.0 * n)) / denom;
    let margin = z * (p * (1.0 - p) / n + z2 / (4.0 * n * n)).sqrt() / denom;
    ((center - margin).max(0.0), (center + margin).min(1.0))
}

/// Two-sided two-proportion z-test on success counts.
fn two_proportion_p_value(s1: usize, n1: usize, s2: usize, n2: usize) -> f64 {
    if n1 == 0 || n2 == 0 {
        return 1.0;
    }
    let p1 = s1 as f64 / n1 as f64;
    let p2 = s2 as f64 / n2 as f64;
    let pooled = (s1 + s2) as f64 / (n1 + n2) as f64;
    let variance = pooled * (1.0 - pooled) * (1.0 / n1 as f64 + 1.0 / n2 as f64);
    if variance <= 0.0 {
        return 1.0;
    }

    let z = (p1 - p2).abs() / variance.sqrt();
    let normal = Normal::new(0.0, 1.0).unwrap();
    let p = 2.0 * (1.0 - normal.cdf(z));
    p.clamp(0.0, 1.0)
}
