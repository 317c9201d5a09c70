use super::{finish, lookup_title, open_store};
use crate::output::Output;
use crate::HistoryCommands;
use color_eyre::Result;
use ignisplay_config::Config;
use ignisplay_models::HistoryEntry;
use serde_json::json;

pub async fn run_history(cmd: HistoryCommands, config: &Config, user: Option<&str>, output: &Output) -> Result<()> {
    let store = open_store(config, user).await?;

    match cmd {
        HistoryCommands::List => show_history(&store.history(), output),
        HistoryCommands::Add { movie_id, progress } => {
            let mut movie = lookup_title(&movie_id)?;
            if let Some(progress) = progress {
                movie = movie.with_progress(progress);
            }
            let title = movie.title.clone();
            store.record_view(movie);
            finish(&store, output).await;
            output.success(format!("Recorded a view of {}", title));
        }
        HistoryCommands::Remove { movie_id } => {
            let present = store.history().iter().any(|entry| entry.id() == movie_id);
            if !present {
                output.warn(format!("{} is not in the watch history", movie_id));
                return Ok(());
            }
            store.remove_view(&movie_id);
            finish(&store, output).await;
            output.success(format!("Removed {} from the watch history", movie_id));
        }
        HistoryCommands::Clear => {
            let count = store.history().len();
            store.clear_all();
            finish(&store, output).await;
            output.success(format!("Cleared {} title(s) from the watch history", count));
        }
    }

    Ok(())
}

fn show_history(history: &[HistoryEntry], output: &Output) {
    if !output.is_human() {
        output.json(&json!({ "history": history }));
        return;
    }
    if history.is_empty() {
        output.info("Nothing watched yet");
        return;
    }

    let rows = history
        .iter()
        .map(|entry| {
            vec![
                entry.movie.id.clone(),
                entry.movie.title.clone(),
                entry
                    .movie
                    .progress
                    .map(|p| format!("{:.0}%", p * 100.0))
                    .unwrap_or_else(|| "-".to_string()),
                entry
                    .watched_at
                    .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "-".to_string()),
            ]
        })
        .collect();
    output.table(&["Id", "Title", "Progress", "Watched"], rows);
}
