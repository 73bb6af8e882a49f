use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use rand::{RngCore, SeedableRng, rngs::StdRng};
use serde::Serialize;
use thiserror::Error;
use tracing::{Level, event};

use inquest_bot::{CharacterUpdate, FeedbackOutcome, Quizmaster, UniformSelector};
use inquest_core::model::{Catalog, CatalogError, CharacterId};

use crate::analytics::{AnalyticsCollector, AnalyticsError};
use crate::config::{AgentConfig, EvalConfig, ResolvedOutputs, SelectorKind};
use crate::oracle::Oracle;

/// Primary entry point for orchestrating evaluation runs.
pub struct EvalRunner {
    config: EvalConfig,
    outputs: ResolvedOutputs,
    catalog: Catalog,
    logging_enabled: bool,
}

/// Summary details returned after a run.
pub struct RunSummary {
    pub games_played: usize,
    pub agents: usize,
    pub rows_written: usize,
    pub jsonl_path: PathBuf,
    pub summary_path: PathBuf,
    pub plot_path: Option<PathBuf>,
    pub kb_paths: Vec<PathBuf>,
}

impl EvalRunner {
    /// Build a runner from a validated configuration.
    pub fn new(config: EvalConfig, outputs: ResolvedOutputs) -> Result<Self, RunnerError> {
        let catalog = if let Some(path) = config.catalog.path.as_ref() {
            Catalog::from_path(path)?
        } else if let Some(spec) = config.catalog.synthetic {
            Catalog::synthetic(spec, config.games.seed.unwrap_or(0))?
        } else {
            // Config validation guarantees one source; this is unreachable
            // through `EvalConfig::from_path`.
            return Err(RunnerError::game("no catalog source given".to_string()));
        };

        Ok(Self {
            logging_enabled: config.logging.enable_structured,
            config,
            outputs,
            catalog,
        })
    }

    /// Execute the evaluation, streaming JSONL rows to disk.
    pub fn run(&self) -> Result<RunSummary, RunnerError> {
        ensure_parent(self.outputs.jsonl.parent())?;
        ensure_parent(self.outputs.summary_md.parent())?;
        if !self.outputs.plots_dir.as_os_str().is_empty() {
            fs::create_dir_all(&self.outputs.plots_dir)?;
        }

        let mut writer = BufWriter::new(File::create(&self.outputs.jsonl)?);
        let mut rng = StdRng::seed_from_u64(self.config.games.seed.unwrap_or(0));
        let mut rows_written = 0usize;
        let mut analytics = AnalyticsCollector::new(&self.config)?;

        let mut agents: Vec<AgentState> = self
            .config
            .agents
            .iter()
            .map(|config| AgentState {
                config: config.clone(),
                catalog: self.catalog.clone(),
            })
            .collect();

        for game_index in 0..self.config.games.count {
            let game_seed = rng.next_u64();
            let hidden = hidden_index(game_seed, self.catalog.character_count());

            for agent in agents.iter_mut() {
                let outcome = self.play_game(agent, game_seed, hidden)?;
                analytics.record_game(&agent.config.name, &outcome)?;
                rows_written += write_game_row(
                    &mut writer,
                    &self.config.run_id,
                    game_index,
                    game_seed,
                    &agent.config.name,
                    &outcome,
                )?;
            }
        }

        writer.flush()?;

        let summary = analytics.finalize()?;
        summary.write_markdown(&self.outputs.summary_md)?;
        let plot_path = match summary.render_plot(&self.outputs.plots_dir) {
            Ok(path) => Some(path),
            Err(err) => {
                eprintln!("WARN: {}", err);
                None
            }
        };

        let mut kb_paths = Vec::new();
        if let Some(template) = self.outputs.kb_out.as_ref() {
            for agent in &agents {
                if !agent.config.learning {
                    continue;
                }
                let path = PathBuf::from(template.replace("{agent}", &agent.config.name));
                ensure_parent(path.parent())?;
                agent.catalog.save(&path)?;
                kb_paths.push(path);
            }
        }

        Ok(RunSummary {
            games_played: self.config.games.count,
            agents: agents.len(),
            rows_written,
            jsonl_path: self.outputs.jsonl.clone(),
            summary_path: self.outputs.summary_md.clone(),
            plot_path,
            kb_paths,
        })
    }

    /// Plays one full game for `agent` against the scripted oracle.
    ///
    /// The agent only ever sees grades; the hidden index stays on the oracle
    /// side. Learning agents fold a confirmed update into their own catalog
    /// copy before the next game.
    fn play_game(
        &self,
        agent: &mut AgentState,
        game_seed: u64,
        hidden: usize,
    ) -> Result<GameOutcome, RunnerError> {
        let engine = self.config.engine;
        let mut master = match agent.config.selector {
            SelectorKind::Entropy => Quizmaster::new(engine),
            SelectorKind::Uniform => {
                Quizmaster::with_selector(engine, Box::new(UniformSelector::seeded(game_seed)))
            }
        };
        let mut oracle = Oracle::new(&self.config.oracle, game_seed);

        let (result, questions, wrong_guesses) = {
            let catalog = &agent.catalog;
            let (mut session, mut report) = master.begin(catalog);
            let mut wrong_guesses = 0u32;

            let result = loop {
                if let Some(question) = report.question.clone() {
                    let idx = catalog.index_of_question(&question.id).ok_or_else(|| {
                        RunnerError::game(format!("selector offered unknown question {}", question.id))
                    })?;
                    let grade = oracle.grade(catalog, hidden, idx);
                    report = master
                        .answer(catalog, &mut session, idx, grade)
                        .map_err(|err| RunnerError::game(err.to_string()))?;
                    continue;
                }

                let Some(guess) = report.guess.clone() else {
                    break GameResult::NoMatch;
                };
                let correct = catalog.character(hidden).id == guess.id;
                match master
                    .feedback(catalog, &mut session, correct)
                    .map_err(|err| RunnerError::game(err.to_string()))?
                {
                    FeedbackOutcome::Confirmed { update, .. } => {
                        break GameResult::Solved { update };
                    }
                    FeedbackOutcome::RejectedContinue => {
                        wrong_guesses += 1;
                        report = master.resume(catalog, &mut session);
                    }
                    FeedbackOutcome::NoMatch => {
                        wrong_guesses += 1;
                        break GameResult::NoMatch;
                    }
                }
            };

            (result, session.questions_taken(), wrong_guesses)
        };

        let solved = matches!(result, GameResult::Solved { .. });
        let mut learned = false;
        if agent.config.learning
            && let GameResult::Solved {
                update: Some(update),
            } = result
        {
            learned = update.apply_to(&mut agent.catalog);
        }

        if self.logging_enabled && tracing::enabled!(Level::INFO) {
            event!(
                target: "inquest_bench::game",
                Level::INFO,
                run_id = %self.config.run_id,
                agent = %agent.config.name,
                hidden = %self.catalog.character(hidden).id,
                solved,
                questions = questions as u32,
                wrong_guesses,
                learned,
            );
        }

        Ok(GameOutcome {
            hidden: self.catalog.character(hidden).id.clone(),
            solved,
            questions,
            wrong_guesses,
            learned,
        })
    }
}

/// Deterministic hidden-character pick shared by every agent in a game.
fn hidden_index(game_seed: u64, character_count: usize) -> usize {
    (game_seed % character_count as u64) as usize
}

fn ensure_parent(path: Option<&Path>) -> Result<(), RunnerError> {
    if let Some(dir) = path.filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

fn write_game_row(
    writer: &mut BufWriter<File>,
    run_id: &str,
    game_index: usize,
    game_seed: u64,
    agent: &str,
    outcome: &GameOutcome,
) -> Result<usize, RunnerError> {
    let row = GameLogRow {
        run_id: run_id.to_string(),
        game_id: format!("G{game_index:05}"),
        game_index,
        game_seed,
        agent: agent.to_string(),
        hidden: outcome.hidden.to_string(),
        solved: outcome.solved,
        questions: outcome.questions,
        wrong_guesses: outcome.wrong_guesses,
        learned: outcome.learned,
    };

    serde_json::to_writer(&mut *writer, &row)?;
    writer.write_all(b"\n")?;
    Ok(1)
}

struct AgentState {
    config: AgentConfig,
    catalog: Catalog,
}

enum GameResult {
    Solved { update: Option<CharacterUpdate> },
    NoMatch,
}

/// What one simulated game produced.
pub struct GameOutcome {
    pub hidden: CharacterId,
    pub solved: bool,
    pub questions: usize,
    pub wrong_guesses: u32,
    pub learned: bool,
}

#[derive(Serialize)]
struct GameLogRow {
    run_id: String,
    game_id: String,
    game_index: usize,
    game_seed: u64,
    agent: String,
    hidden: String,
    solved: bool,
    questions: usize,
    wrong_guesses: u32,
    learned: bool,
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
    #[error("failed to serialize log row: {source}")]
    Serialize {
        #[from]
        source: serde_json::Error,
    },
    #[error("catalog error: {source}")]
    Catalog {
        #[from]
        source: CatalogError,
    },
    #[error("game execution failed: {message}")]
    Game { message: String },
    #[error("analytics error: {0}")]
    Analytics(#[from] AnalyticsError),
}

impl RunnerError {
    fn game(message: String) -> Self {
        RunnerError::Game { message }
    }
}
