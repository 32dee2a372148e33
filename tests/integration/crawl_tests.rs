//! Integration tests for the scraper
//!
//! These tests use wiremock to stand in for the lyrics website and run
//! full scrapes end-to-end against a temporary music database.

use lyrics_scraper::config::{parse_config, Config};
use lyrics_scraper::crawler::Coordinator;
use lyrics_scraper::storage::{SqliteStorage, Storage, UrlKind};
use lyrics_scraper::FailureKind;
use std::path::Path;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Builds a config pointing the site at the mock server
///
/// `extra` is appended verbatim and holds the options and targets of a test.
fn create_test_config(server: &MockServer, dir: &Path, extra: &str) -> Config {
    let toml = format!(
        r#"
db_filepath = '{db}'
webcache_dirpath = '{cache}'
use_webcache = false
delay_between_requests = 0.0
http_get_timeout = 5.0
{extra}

[site]
base_url = '{uri}/'
search_url = '{uri}/search.php'
"#,
        db = dir.join("music.sqlite").display(),
        cache = dir.join("webcache").display(),
        uri = server.uri(),
        extra = extra,
    );
    parse_config(&toml).expect("test config should be valid")
}

fn open_db(dir: &Path) -> SqliteStorage {
    SqliteStorage::new(&dir.join("music.sqlite")).expect("Failed to open database")
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body)
        .insert_header("content-type", "text/html")
}

fn song_search_page(results: &[(&str, &str, &str)]) -> String {
    let rows: String = results
        .iter()
        .map(|(title, artist, href)| {
            format!(
                r#"<tr><td class="text-left visitedlyr"><a href="{}"><b>"{}"</b></a> - <b>{}</b></td></tr>"#,
                href, title, artist
            )
        })
        .collect();
    format!("<html><body><table>{}</table></body></html>", rows)
}

fn song_page(artist: &str, title: &str, album: Option<(&str, i32)>, lyrics: &str) -> String {
    let panel = album
        .map(|(album, year)| {
            format!(
                r#"<div class="panel songlist-panel noprint">album: <b>"{}"</b> ({})<br></div>"#,
                album, year
            )
        })
        .unwrap_or_default();
    format!(
        r#"<html><head><title>{artist} - {title} Lyrics | AZLyrics.com</title></head><body>
<div class="ringtone"></div>
<b>"{title}"</b>
<div>
{lyrics}
</div>
{panel}
</body></html>"#,
        artist = artist,
        title = title,
        lyrics = lyrics,
        panel = panel
    )
}

/// Depeche Mode catalog: two albums and one song without album
const ARTIST_PAGE: &str = r#"<html><head><title>Depeche Mode Lyrics</title></head><body>
<div id="listAlbum">
<div class="album" id="7863">album: <b>"Speak &amp; Spell"</b> (1981)</div>
<a href="/lyrics/depechemode/newlife.html">New Life</a><br>
<a href="/lyrics/depechemode/justcantgetenough.html">Just Can't Get Enough</a><br>
<div class="album" id="7852">album: <b>"A Broken Frame"</b> (1982)</div>
<a href="/lyrics/depechemode/leaveinsilence.html">Leave In Silence</a><br>
<a href="/lyrics/depechemode/seethelight.html">See You</a><br>
<div class="album">other songs:</div>
<a href="/lyrics/depechemode/martyr.html">Martyr</a><br>
</div>
</body></html>"#;

const CATALOG: &[(&str, &str, Option<(&str, i32)>)] = &[
    ("newlife", "New Life", Some(("Speak & Spell", 1981))),
    ("justcantgetenough", "Just Can't Get Enough", Some(("Speak & Spell", 1981))),
    ("leaveinsilence", "Leave In Silence", Some(("A Broken Frame", 1982))),
    ("seethelight", "See You", Some(("A Broken Frame", 1982))),
    ("martyr", "Martyr", None),
];

/// Mounts the New Life search and lyrics pages
async fn mount_new_life(server: &MockServer, expected_calls: Option<u64>) {
    let search = Mock::given(method("GET"))
        .and(path("/search.php"))
        .and(query_param("q", "New life by Depeche Mode"))
        .and(query_param("w", "songs"))
        .respond_with(html(song_search_page(&[
            ("New Life", "Depeche Mode", "/lyrics/depechemode/newlife.html"),
            ("New Life (Remix)", "Depeche Mode", "/lyrics/depechemode/newliferemix.html"),
        ])));
    let page = Mock::given(method("GET"))
        .and(path("/lyrics/depechemode/newlife.html"))
        .respond_with(html(song_page(
            "Depeche Mode",
            "New Life",
            Some(("Speak & Spell", 1981)),
            "I stand still stepping on a shady street",
        )));

    match expected_calls {
        Some(n) => {
            search.expect(n).mount(server).await;
            page.expect(n).mount(server).await;
        }
        None => {
            search.mount(server).await;
            page.mount(server).await;
        }
    }
}

/// Mounts the artist page and every lyrics page of the catalog
async fn mount_catalog(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/d/depechemode.html"))
        .respond_with(html(ARTIST_PAGE.to_string()))
        .mount(server)
        .await;

    for (slug, title, album) in CATALOG {
        Mock::given(method("GET"))
            .and(path(format!("/lyrics/depechemode/{}.html", slug)))
            .respond_with(html(song_page(
                "Depeche Mode",
                title,
                *album,
                &format!("lyrics of {}", title),
            )))
            .mount(server)
            .await;
    }
}

const NEW_LIFE_TARGET: &str = r#"
[songs_config]
targets = [{ title = "New life", artist = "Depeche Mode" }]
"#;

#[tokio::test]
async fn test_end_to_end_single_song() {
    let server = MockServer::start().await;
    mount_new_life(&server, Some(1)).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, dir.path(), NEW_LIFE_TARGET);

    let mut coordinator = Coordinator::new(config).unwrap();
    let summary = coordinator.run().await.unwrap();

    assert_eq!(summary.targets.persisted, 1);
    assert_eq!(summary.songs.persisted, 1);
    assert!(summary.failures.is_empty());
    assert_eq!(summary.network_requests, 2);

    let storage = open_db(dir.path());
    assert_eq!(storage.count_artists().unwrap(), 1);
    assert_eq!(storage.count_songs().unwrap(), 1);

    let song = storage
        .get_song("New Life", "Depeche Mode", Some("Speak & Spell"))
        .unwrap()
        .expect("song should be stored");
    assert_eq!(song.year, Some(1981));
    assert_eq!(
        song.lyrics.as_deref(),
        Some("I stand still stepping on a shady street")
    );

    let album = storage
        .get_album("Speak & Spell", "Depeche Mode")
        .unwrap()
        .expect("album should be stored");
    assert_eq!(album.year, Some(1981));

    let url = format!("{}/lyrics/depechemode/newlife.html", server.uri());
    let record = storage.get_url_record(UrlKind::Song, &url).unwrap().unwrap();
    assert_eq!(record.owner.as_deref(), Some("New Life"));
    assert!(!record.error_on_last_time);
    assert_eq!(record.nb_requests, 1);
}

#[tokio::test]
async fn test_web_cache_serves_second_run() {
    let server = MockServer::start().await;
    mount_new_life(&server, Some(1)).await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&server, dir.path(), NEW_LIFE_TARGET);
    config.use_webcache = true;

    let first = Coordinator::new(config.clone())
        .unwrap()
        .run()
        .await
        .unwrap();
    assert_eq!(first.network_requests, 2);
    assert_eq!(first.cache_hits, 0);

    let second = Coordinator::new(config).unwrap().run().await.unwrap();
    assert_eq!(second.network_requests, 0);
    assert_eq!(second.cache_hits, 2);
    assert_eq!(second.songs.persisted, 1);

    assert!(dir.path().join("webcache").join("webcache.sqlite").exists());
}

#[tokio::test]
async fn test_expired_cache_entries_are_fetched_again() {
    let server = MockServer::start().await;
    mount_new_life(&server, Some(2)).await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&server, dir.path(), NEW_LIFE_TARGET);
    config.use_webcache = true;
    config.expire_after = 0;

    Coordinator::new(config.clone()).unwrap().run().await.unwrap();
    let second = Coordinator::new(config).unwrap().run().await.unwrap();
    assert_eq!(second.network_requests, 2);
    assert_eq!(second.cache_hits, 0);
}

#[tokio::test]
async fn test_requests_are_spaced_by_delay() {
    let server = MockServer::start().await;
    mount_new_life(&server, None).await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&server, dir.path(), NEW_LIFE_TARGET);
    config.delay_between_requests = 0.3;

    let start = Instant::now();
    let summary = Coordinator::new(config).unwrap().run().await.unwrap();

    // search page, then lyrics page
    assert_eq!(summary.network_requests, 2);
    assert!(start.elapsed() >= Duration::from_millis(300));
}

#[tokio::test]
async fn test_random_sampling_is_deterministic() {
    let server = MockServer::start().await;
    mount_catalog(&server).await;

    let targets = format!(
        r#"
seed = 42

[artists_config]
targets = [{{ name = "Depeche Mode", url = "{}/d/depechemode.html", max_songs = 2, choose_random = true, include_unknown_year = true }}]
"#,
        server.uri()
    );

    let mut picked = Vec::new();
    for _ in 0..2 {
        let dir = TempDir::new().unwrap();
        let config = create_test_config(&server, dir.path(), &targets);
        let summary = Coordinator::new(config).unwrap().run().await.unwrap();
        assert_eq!(summary.targets.persisted, 1);
        assert_eq!(summary.songs.persisted, 2);

        let titles: Vec<String> = open_db(dir.path())
            .list_songs()
            .unwrap()
            .into_iter()
            .map(|song| song.title)
            .collect();
        picked.push(titles);
    }

    assert_eq!(picked[0], picked[1]);
    assert_eq!(picked[0].len(), 2);
}

#[tokio::test]
async fn test_artist_year_filter() {
    let server = MockServer::start().await;
    mount_catalog(&server).await;

    let dir = TempDir::new().unwrap();
    let targets = format!(
        r#"
[artists_config]
targets = [{{ name = "Depeche Mode", url = "{}/d/depechemode.html", year_after = 1982 }}]
"#,
        server.uri()
    );
    let config = create_test_config(&server, dir.path(), &targets);

    let summary = Coordinator::new(config).unwrap().run().await.unwrap();

    // "other songs" are left out of the catalog without include_unknown_year
    assert_eq!(summary.songs.persisted, 2);
    assert_eq!(summary.songs.skipped, 2);

    let storage = open_db(dir.path());
    let albums: Vec<Option<String>> = storage
        .list_songs()
        .unwrap()
        .into_iter()
        .map(|song| song.album)
        .collect();
    assert_eq!(albums, vec![Some("A Broken Frame".to_string()); 2]);

    let artist_url = format!("{}/d/depechemode.html", server.uri());
    let record = storage
        .get_url_record(UrlKind::Artist, &artist_url)
        .unwrap()
        .unwrap();
    assert_eq!(record.owner.as_deref(), Some("Depeche Mode"));
}

#[tokio::test]
async fn test_album_target_by_url() {
    let server = MockServer::start().await;
    mount_catalog(&server).await;

    let dir = TempDir::new().unwrap();
    let targets = format!(
        r#"
[albums_config]
targets = [{{ title = "Speak & Spell", url = "{}/d/depechemode.html#7863" }}]
"#,
        server.uri()
    );
    let config = create_test_config(&server, dir.path(), &targets);

    let summary = Coordinator::new(config).unwrap().run().await.unwrap();
    assert_eq!(summary.targets.persisted, 1);
    assert_eq!(summary.songs.persisted, 2);

    let storage = open_db(dir.path());
    assert_eq!(storage.count_albums().unwrap(), 1);
    assert!(storage
        .get_song("Just Can't Get Enough", "Depeche Mode", Some("Speak & Spell"))
        .unwrap()
        .is_some());
}

fn failing_then_working_targets(server: &MockServer, ignore_errors: bool) -> String {
    format!(
        r#"
ignore_errors = {}

[songs_config]
targets = [
    {{ url = "{}/lyrics/depechemode/missing.html" }},
    {{ title = "New life", artist = "Depeche Mode" }},
]
"#,
        ignore_errors,
        server.uri()
    )
}

async fn mount_missing(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/lyrics/depechemode/missing.html"))
        .respond_with(ResponseTemplate::new(404))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_ignore_errors_isolates_failing_target() {
    let server = MockServer::start().await;
    mount_missing(&server).await;
    mount_new_life(&server, Some(1)).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, dir.path(), &failing_then_working_targets(&server, true));

    let summary = Coordinator::new(config).unwrap().run().await.unwrap();
    assert_eq!(summary.targets.failed, 1);
    assert_eq!(summary.targets.persisted, 1);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].kind, Some(FailureKind::NotFound));

    let storage = open_db(dir.path());
    assert_eq!(storage.count_songs().unwrap(), 1);

    let missing = format!("{}/lyrics/depechemode/missing.html", server.uri());
    let record = storage
        .get_url_record(UrlKind::Song, &missing)
        .unwrap()
        .unwrap();
    assert!(record.error_on_last_time);
    assert_eq!(record.owner, None);
}

#[tokio::test]
async fn test_first_failure_aborts_without_ignore_errors() {
    let server = MockServer::start().await;
    mount_missing(&server).await;
    mount_new_life(&server, Some(0)).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, dir.path(), &failing_then_working_targets(&server, false));

    let mut coordinator = Coordinator::new(config).unwrap();
    let err = coordinator.run().await.unwrap_err();
    assert_eq!(err.kind(), Some(FailureKind::NotFound));

    let summary = coordinator.summary();
    assert!(summary.aborted);
    assert_eq!(summary.targets.failed, 1);
    assert_eq!(summary.targets.persisted, 0);
    assert_eq!(open_db(dir.path()).count_songs().unwrap(), 0);
}

#[tokio::test]
async fn test_simulate_writes_nothing() {
    let server = MockServer::start().await;
    mount_new_life(&server, Some(1)).await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&server, dir.path(), NEW_LIFE_TARGET);
    config.simulate = true;

    let summary = Coordinator::new(config).unwrap().run().await.unwrap();
    assert!(summary.simulated);
    assert_eq!(summary.songs.persisted, 1);
    assert!(!dir.path().join("music.sqlite").exists());
}

#[tokio::test]
async fn test_rerun_is_idempotent() {
    let server = MockServer::start().await;
    mount_new_life(&server, None).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, dir.path(), NEW_LIFE_TARGET);

    Coordinator::new(config.clone()).unwrap().run().await.unwrap();
    let first = open_db(dir.path()).list_songs().unwrap();

    Coordinator::new(config).unwrap().run().await.unwrap();
    let storage = open_db(dir.path());
    assert_eq!(storage.list_songs().unwrap(), first);
    assert_eq!(storage.count_artists().unwrap(), 1);
    assert_eq!(storage.count_albums().unwrap(), 1);

    let url = format!("{}/lyrics/depechemode/newlife.html", server.uri());
    let record = storage.get_url_record(UrlKind::Song, &url).unwrap().unwrap();
    assert_eq!(record.nb_requests, 2);
}

#[tokio::test]
async fn test_overwrite_db_truncates_previous_rows() {
    let server = MockServer::start().await;
    mount_new_life(&server, None).await;
    mount_catalog(&server).await;

    let dir = TempDir::new().unwrap();
    let artist_targets = format!(
        r#"
[artists_config]
targets = [{{ name = "Depeche Mode", url = "{}/d/depechemode.html", max_songs = 3 }}]
"#,
        server.uri()
    );
    let config = create_test_config(&server, dir.path(), &artist_targets);
    Coordinator::new(config).unwrap().run().await.unwrap();
    assert_eq!(open_db(dir.path()).count_songs().unwrap(), 3);

    let mut config = create_test_config(&server, dir.path(), NEW_LIFE_TARGET);
    config.overwrite_db = true;
    Coordinator::new(config).unwrap().run().await.unwrap();
    assert_eq!(open_db(dir.path()).count_songs().unwrap(), 1);
}

#[tokio::test]
async fn test_unknown_search_result_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search.php"))
        .respond_with(html("<html><body>Sorry, your search returned no results.</body></html>".to_string()))
        .expect(2)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let targets = r#"
ignore_errors = true

[songs_config]
targets = ["Nonexistent song by Nobody"]
"#;
    let config = create_test_config(&server, dir.path(), targets);

    let summary = Coordinator::new(config).unwrap().run().await.unwrap();
    assert_eq!(summary.targets.failed, 1);
    assert_eq!(summary.failures[0].kind, Some(FailureKind::NotFound));
}

#[tokio::test]
async fn test_repeated_target_searches_once_per_run() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search.php"))
        .and(query_param("q", "New life by Depeche Mode"))
        .respond_with(html(song_search_page(&[(
            "New Life",
            "Depeche Mode",
            "/lyrics/depechemode/newlife.html",
        )])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/lyrics/depechemode/newlife.html"))
        .respond_with(html(song_page(
            "Depeche Mode",
            "New Life",
            Some(("Speak & Spell", 1981)),
            "I stand still stepping on a shady street",
        )))
        .expect(2)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let targets = r#"
[songs_config]
targets = ["New life by Depeche Mode", { title = "new  LIFE", artist = "depeche mode" }]
"#;
    let config = create_test_config(&server, dir.path(), targets);

    let summary = Coordinator::new(config).unwrap().run().await.unwrap();
    assert_eq!(summary.targets.persisted, 2);
    assert_eq!(summary.network_requests, 3);
    assert_eq!(open_db(dir.path()).count_songs().unwrap(), 1);
}

#[tokio::test]
async fn test_album_target_resolved_through_search() {
    let server = MockServer::start().await;
    mount_catalog(&server).await;
    Mock::given(method("GET"))
        .and(path("/search.php"))
        .and(query_param("q", "Speak & Spell by Depeche Mode"))
        .and(query_param("w", "albums"))
        .respond_with(html(
            r#"<html><body><table>
<tr><td class="text-left visitedlyr"><a href="/d/depechemode.html#7852"><b>Depeche Mode - A Broken Frame</b></a></td></tr>
<tr><td class="text-left visitedlyr"><a href="/d/depechemode.html#7863"><b>Depeche Mode - Speak &amp; Spell</b></a></td></tr>
</table></body></html>"#
                .to_string(),
        ))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let targets = r#"
best_match = true

[albums_config]
targets = [{ title = "Speak & Spell", artist = "Depeche Mode" }]
"#;
    let config = create_test_config(&server, dir.path(), targets);

    let summary = Coordinator::new(config).unwrap().run().await.unwrap();
    assert_eq!(summary.targets.persisted, 1);
    assert_eq!(summary.songs.persisted, 2);

    let storage = open_db(dir.path());
    assert_eq!(storage.count_albums().unwrap(), 1);
    assert!(storage
        .get_album("Speak & Spell", "Depeche Mode")
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_artist_target_resolved_through_search() {
    let server = MockServer::start().await;
    mount_catalog(&server).await;
    Mock::given(method("GET"))
        .and(path("/search.php"))
        .and(query_param("q", "Depeche Mode"))
        .and(query_param("w", "artists"))
        .respond_with(html(
            r#"<html><body><table>
<tr><td class="text-left visitedlyr"><a href="/d/depechemode.html"><b>Depeche Mode</b></a></td></tr>
</table></body></html>"#
                .to_string(),
        ))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let targets = r#"
[artists_config]
targets = [{ name = "Depeche Mode", max_songs = 1 }]
"#;
    let config = create_test_config(&server, dir.path(), targets);

    let summary = Coordinator::new(config).unwrap().run().await.unwrap();
    assert_eq!(summary.targets.persisted, 1);
    assert_eq!(summary.songs.persisted, 1);

    let songs = open_db(dir.path()).list_songs().unwrap();
    assert_eq!(songs.len(), 1);
    assert_eq!(songs[0].title, "New Life");
}
