use super::{finish, lookup_title, open_store};
use crate::output::Output;
use crate::MyListCommands;
use color_eyre::Result;
use ignisplay_config::Config;
use serde_json::json;

pub async fn run_my_list(cmd: MyListCommands, config: &Config, user: Option<&str>, output: &Output) -> Result<()> {
    let store = open_store(config, user).await?;

    match cmd {
        MyListCommands::List => {
            let my_list = store.my_list();
            if !output.is_human() {
                output.json(&json!({ "myList": my_list }));
            } else if my_list.is_empty() {
                output.info("My list is empty");
            } else {
                let rows = my_list
                    .iter()
                    .map(|movie| {
                        vec![
                            movie.id.clone(),
                            movie.title.clone(),
                            movie.year.clone().unwrap_or_default(),
                            movie.rating.clone().unwrap_or_default(),
                        ]
                    })
                    .collect();
                output.table(&["Id", "Title", "Year", "Rating"], rows);
            }
        }
        MyListCommands::Toggle { movie_id } => {
            let movie = lookup_title(&movie_id)?;
            let title = movie.title.clone();
            let saved = store.toggle_saved(movie);
            finish(&store, output).await;
            output.json(&json!({ "id": movie_id, "saved": saved }));
            if saved {
                output.success(format!("Added {} to my list", title));
            } else {
                output.success(format!("Removed {} from my list", title));
            }
        }
    }

    Ok(())
}
