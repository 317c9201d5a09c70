use crate::output::Output;
use crate::CatalogRow;
use ignisplay_models::catalog;
use serde_json::json;

pub fn run_catalog(row: CatalogRow, output: &Output) {
    let movies = match row {
        CatalogRow::Trending => catalog::trending(),
        CatalogRow::New => catalog::new_releases(),
        CatalogRow::Top => catalog::top(),
    };

    if !output.is_human() {
        output.json(&json!({ "movies": movies }));
        return;
    }

    let rows = movies
        .iter()
        .map(|movie| {
            vec![
                movie.id.clone(),
                movie.title.clone(),
                movie.year.clone().unwrap_or_default(),
                movie.rating.clone().unwrap_or_default(),
                movie.duration.clone().unwrap_or_default(),
            ]
        })
        .collect();
    output.table(&["Id", "Title", "Year", "Rating", "Duration"], rows);
}
