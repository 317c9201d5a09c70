//! Static mock catalog used by the browse screens and the CLI.

use crate::movie::{MediaKind, MovieRecord};

fn entry(
    id: &str,
    title: &str,
    poster_url: &str,
    backdrop_url: &str,
    description: &str,
    (year, rating, duration): (&str, &str, &str),
) -> MovieRecord {
    MovieRecord {
        id: id.to_string(),
        title: title.to_string(),
        poster_url: poster_url.to_string(),
        backdrop_url: Some(backdrop_url.to_string()),
        description: Some(description.to_string()),
        year: Some(year.to_string()),
        rating: Some(rating.to_string()),
        duration: Some(duration.to_string()),
        progress: None,
        kind: Some(MediaKind::Movie),
    }
}

pub fn trending() -> Vec<MovieRecord> {
    vec![
        entry(
            "trending-1",
            "Inception",
            "https://image.tmdb.org/t/p/w500/oYuLEt3zVCKq57qu2F8dT7NIa6f.jpg",
            "https://image.tmdb.org/t/p/w1280/s3TBrRGB1iav7gFOCNx3H31MoES.jpg",
            "A thief who steals corporate secrets through dream-sharing technology is given the inverse task of planting an idea into the mind of a CEO.",
            ("2010", "8.8", "2h 28min"),
        ),
        entry(
            "trending-2",
            "The Dark Knight",
            "https://image.tmdb.org/t/p/w500/qJ2tW6WMUDux911r6m7haRef0WH.jpg",
            "https://image.tmdb.org/t/p/w1280/hqkIcbrOHL86UncnHIsHVcVmzue.jpg",
            "When the menace known as the Joker wreaks havoc and chaos on the people of Gotham, Batman must accept one of the greatest psychological and physical tests.",
            ("2008", "9.0", "2h 32min"),
        ),
        entry(
            "trending-3",
            "Interstellar",
            "https://image.tmdb.org/t/p/w500/gEU2QniE6E77NI6lCU6MxlNBvIx.jpg",
            "https://image.tmdb.org/t/p/w1280/rAiYTfKGqDCRIIqo664sY9XZIvQ.jpg",
            "A team of explorers travel through a wormhole in space in an attempt to ensure humanity's survival.",
            ("2014", "8.6", "2h 49min"),
        ),
        entry(
            "trending-4",
            "Dune",
            "https://image.tmdb.org/t/p/w500/d5NXSklXo0qyIYkgV94XAgMIckC.jpg",
            "https://image.tmdb.org/t/p/w1280/mYQA4FpMgcaFYyingCYlFLOj1vK.jpg",
            "A noble family becomes embroiled in a war for control over the galaxy's most valuable asset.",
            ("2021", "8.0", "2h 35min"),
        ),
        entry(
            "trending-5",
            "Parasite",
            "https://image.tmdb.org/t/p/w500/7IiTTgloJzvGI1TAYymCfbfl3vT.jpg",
            "https://image.tmdb.org/t/p/w1280/TU9NIjwzjoKPwQHoyzUZjKYwKR.jpg",
            "Greed and class discrimination threaten the newly formed symbiotic relationship between the wealthy Park family and the destitute Kim clan.",
            ("2019", "8.5", "2h 12min"),
        ),
        entry(
            "trending-6",
            "The Matrix",
            "https://image.tmdb.org/t/p/w500/f89U3ADr1oiB1s9GkdPOEpXUk5H.jpg",
            "https://image.tmdb.org/t/p/w1280/fNG7i7RqMErkcqhohV2a6cV1Ehy.jpg",
            "A computer hacker learns about the true nature of his reality and his role in the war against its controllers.",
            ("1999", "8.7", "2h 16min"),
        ),
    ]
}

pub fn new_releases() -> Vec<MovieRecord> {
    vec![
        entry(
            "new-1",
            "Oppenheimer",
            "https://image.tmdb.org/t/p/w500/8Gxv8gSFCU0XGDykEGv7zR1n2ua.jpg",
            "https://image.tmdb.org/t/p/w1280/8Gxv8gSFCU0XGDykEGv7zR1n2ua.jpg",
            "The story of American scientist J. Robert Oppenheimer and his role in the development of the atomic bomb.",
            ("2023", "8.5", "3h 0min"),
        ),
        entry(
            "new-2",
            "Poor Things",
            "https://image.tmdb.org/t/p/w500/kCGlIMHnOm8JPXq3rXM6c5wMxcT.jpg",
            "https://image.tmdb.org/t/p/w1280/kCGlIMHnOm8JPXq3rXM6c5wMxcT.jpg",
            "The incredible tale about the fantastical evolution of Bella Baxter.",
            ("2023", "8.0", "2h 21min"),
        ),
        entry(
            "new-3",
            "Killers of the Flower Moon",
            "https://image.tmdb.org/t/p/w500/dB6Krk806zeqd0YNp2ngQ9zXteH.jpg",
            "https://image.tmdb.org/t/p/w1280/dB6Krk806zeqd0YNp2ngQ9zXteH.jpg",
            "Members of the Osage tribe in the United States are murdered under mysterious circumstances in the 1920s.",
            ("2023", "7.7", "3h 26min"),
        ),
        entry(
            "new-4",
            "The Holdovers",
            "https://image.tmdb.org/t/p/w500/VHSzNBTwxV8vh7wylo7O9CLdac.jpg",
            "https://image.tmdb.org/t/p/w1280/VHSzNBTwxV8vh7wylo7O9CLdac.jpg",
            "A cranky history teacher at a boarding school remains on campus during Christmas break.",
            ("2023", "7.9", "2h 13min"),
        ),
    ]
}

/// Trending followed by new releases
pub fn top() -> Vec<MovieRecord> {
    let mut movies = trending();
    movies.extend(new_releases());
    movies
}

/// Look up a record by id across every section
pub fn find(id: &str) -> Option<MovieRecord> {
    top().into_iter().find(|movie| movie.id == id)
}
