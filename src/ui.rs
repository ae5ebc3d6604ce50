//! Interface de terminal: barra de progresso e saída colorida.
//!
//! Usa as crates `indicatif` para a barra de progresso e `console` para
//! estilização com cores. O [`JobProgress`] acompanha visualmente um job
//! observado pelo orquestrador.

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::error::FailureKind;
use crate::jobs::{JobOutcome, Phase, Project, ProgressObserver, ProgressUpdate};

/// Indicador visual de progresso para um job no terminal.
///
/// Exibe uma barra percentual durante o polling e mensagens coloridas para
/// sucesso (verde), falha (vermelho) e timeout/cancelamento (amarelo).
pub struct JobProgress {
    pb: ProgressBar,
    green: Style,
    red: Style,
    yellow: Style,
}

impl JobProgress {
    /// Inicia a barra com a descrição do job.
    pub fn start(description: &str) -> Self {
        let pb = ProgressBar::new(100);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        pb.set_style(style);
        pb.set_message(format!("{}: {description}", Phase::Submitting));
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
        }
    }

    /// Finaliza a barra e exibe o resultado final do job.
    pub fn complete(&self, outcome: &JobOutcome) {
        self.pb.finish_and_clear();
        match outcome {
            JobOutcome::Completed { .. } => {
                println!("  {} {outcome}", self.green.apply_to("✓"));
            }
            JobOutcome::Failed { kind, .. } => {
                let hint = match kind {
                    FailureKind::Transient => " (try again later)",
                    FailureKind::Terminal => "",
                };
                println!("  {} {outcome}{hint}", self.red.apply_to("✗"));
            }
            JobOutcome::TimedOut { .. } | JobOutcome::Cancelled => {
                println!("  {} {outcome}", self.yellow.apply_to("…"));
            }
        }
    }
}

impl ProgressObserver for JobProgress {
    fn on_progress(&self, update: &ProgressUpdate) {
        self.pb.set_position(u64::from(update.percent));
        self.pb.set_message(format!("{}: {}", update.phase, update.message));
    }
}

/// Imprime o projeto formatado em JSON com estilo colorido pelo status.
pub fn print_project(project: &Project) {
    let style = match project.status {
        crate::jobs::ProjectStatus::Completed => Style::new().green(),
        crate::jobs::ProjectStatus::Failed => Style::new().red(),
        _ => Style::new().yellow(),
    };
    println!(
        "{}",
        style.apply_to(format!("─── {} [{}] ───", project.title, project.status))
    );
    println!(
        "{}",
        serde_json::to_string_pretty(project).unwrap_or_default()
    );
}
