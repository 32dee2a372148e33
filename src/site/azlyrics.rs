//! AZLyrics backend
//!
//! Page layouts this parser relies on:
//!
//! - search results: one `td.visitedlyr` cell per result, holding the link
//!   and the result text in `<b>` tags (song results carry title and artist)
//! - artist page: `<div class="album" id="7863">album: <b>"Speak &amp;
//!   Spell"</b> (1981)</div>` headers, each followed by the song links of that
//!   album up to the next header; a final `other songs:` header lists songs
//!   without album
//! - lyrics page: title `Artist - Song Lyrics`, lyrics inside the only `div`
//!   with neither class nor id, album line inside `div.songlist-panel`

use crate::config::SiteConfig;
use crate::site::{
    AlbumHeader, ArtistPage, Candidate, CatalogSection, CatalogSong, LyricsSite, PageKind,
    SongPage, TargetKind,
};
use crate::{Result, ScrapeError};
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// AZLyrics (or a mirror with the same layout)
#[derive(Debug, Clone)]
pub struct AzLyrics {
    base_url: Url,
    search_url: Url,
}

impl AzLyrics {
    pub fn new(site: &SiteConfig) -> Result<Self> {
        Ok(Self {
            base_url: Url::parse(&site.base_url)?,
            search_url: Url::parse(&site.search_url)?,
        })
    }

    fn is_same_site(&self, url: &Url) -> bool {
        url.host_str() == self.base_url.host_str()
            && url.port_or_known_default() == self.base_url.port_or_known_default()
    }
}

impl LyricsSite for AzLyrics {
    fn name(&self) -> &str {
        "azlyrics"
    }

    fn search_url(&self, kind: TargetKind, query: &str) -> Result<Url> {
        let mut url = self.search_url.clone();
        url.query_pairs_mut()
            .clear()
            .append_pair("q", query)
            .append_pair("w", kind.search_scope())
            .append_pair("p", "1");
        Ok(url)
    }

    fn parse_search_results(
        &self,
        kind: TargetKind,
        page_url: &Url,
        html: &str,
    ) -> Result<Vec<Candidate>> {
        let document = Html::parse_document(html);
        let cell = selector("td.visitedlyr")?;
        let bold = selector("b")?;
        let link = selector("a[href]")?;

        let mut candidates = Vec::new();
        for td in document.select(&cell) {
            let Some(anchor) = td.select(&link).next() else {
                continue;
            };
            let Some(url) = anchor
                .value()
                .attr("href")
                .and_then(|href| page_url.join(href.trim()).ok())
            else {
                continue;
            };

            let texts: Vec<String> = td
                .select(&bold)
                .map(|b| strip_quotes(&element_text(b)))
                .filter(|text| !text.is_empty())
                .collect();

            let text = match (kind, texts.as_slice()) {
                (TargetKind::Song, [title, artist, ..]) => format!("{} by {}", title, artist),
                (_, [first, ..]) => first.clone(),
                (_, []) => strip_quotes(&element_text(anchor)),
            };

            candidates.push(Candidate {
                text,
                url: url.to_string(),
            });
        }

        tracing::debug!("{} {} search results on {}", candidates.len(), kind, page_url);
        Ok(candidates)
    }

    fn parse_artist_page(&self, page_url: &Url, html: &str) -> Result<ArtistPage> {
        let document = Html::parse_document(html);
        let album_div = selector("div.album")?;
        let bold = selector("b")?;
        let link = selector("a[href]")?;

        let title = page_title(&document)?;
        let artist = title
            .split(" Lyrics")
            .next()
            .map(str::trim)
            .unwrap_or_default()
            .to_string();
        if artist.is_empty() {
            return Err(ScrapeError::parse(
                page_url.as_str(),
                format!("no artist name in page title '{}'", title),
            ));
        }

        let mut sections = Vec::new();
        for div in document.select(&album_div) {
            let header_text = element_text(div);
            let album = if header_text.to_lowercase().contains("other songs") {
                None
            } else {
                let (title, year) = title_and_year(div, &bold)
                    .map_err(|message| ScrapeError::parse(page_url.as_str(), message))?;
                Some(AlbumHeader {
                    id: div.value().attr("id").map(str::to_string),
                    title,
                    year,
                })
            };

            let songs = songs_after_header(div, &link, page_url);
            sections.push(CatalogSection { album, songs });
        }

        if sections.is_empty() {
            return Err(ScrapeError::parse(
                page_url.as_str(),
                "no album sections found on artist page",
            ));
        }

        Ok(ArtistPage { artist, sections })
    }

    fn parse_song_page(&self, page_url: &Url, html: &str) -> Result<SongPage> {
        let document = Html::parse_document(html);
        let lyrics_div = selector("div:not([class]):not([id])")?;
        let panel = selector("div.songlist-panel")?;
        let bold = selector("b")?;

        let title = page_title(&document)?;
        let (artist, rest) = title.split_once(" - ").ok_or_else(|| {
            ScrapeError::parse(
                page_url.as_str(),
                format!("page title '{}' is not 'Artist - Song Lyrics'", title),
            )
        })?;
        let song_title = rest.rfind(" Lyrics").map_or(rest, |end| &rest[..end]).trim();

        let blocks: Vec<ElementRef> = document.select(&lyrics_div).collect();
        if blocks.len() != 1 {
            return Err(ScrapeError::parse(
                page_url.as_str(),
                format!("expected exactly one lyrics block, found {}", blocks.len()),
            ));
        }
        let lyrics = blocks[0].text().collect::<String>().trim().to_string();

        let (album, year) = match document.select(&panel).find(|p| p.select(&bold).next().is_some()) {
            Some(panel) => {
                let (album, year) = title_and_year(panel, &bold)
                    .map_err(|message| ScrapeError::parse(page_url.as_str(), message))?;
                (Some(album), year)
            }
            None => (None, None),
        };

        Ok(SongPage {
            title: song_title.to_string(),
            artist: artist.trim().to_string(),
            album,
            year,
            lyrics,
        })
    }

    fn classify_url(&self, url: &str) -> Result<(Url, PageKind)> {
        let parsed = Url::parse(url.trim()).map_err(|e| {
            ScrapeError::InvalidTarget(format!("'{}' is not a valid URL: {}", url, e))
        })?;

        if !self.is_same_site(&parsed) {
            return Err(ScrapeError::InvalidTarget(format!(
                "'{}' does not belong to {}",
                url, self.base_url
            )));
        }

        let path = parsed.path();
        let kind = if !path.ends_with(".html") {
            return Err(ScrapeError::InvalidTarget(format!(
                "'{}' is neither a lyrics page nor an artist page",
                url
            )));
        } else if path.contains("/lyrics/") {
            PageKind::Song
        } else {
            PageKind::Artist {
                album_id: parsed
                    .fragment()
                    .filter(|id| !id.is_empty())
                    .map(str::to_string),
            }
        };

        Ok((parsed, kind))
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css)
        .map_err(|e| ScrapeError::parse(css, format!("invalid selector: {:?}", e)))
}

fn page_title(document: &Html) -> Result<String> {
    let title = selector("title")?;
    document
        .select(&title)
        .next()
        .map(element_text)
        .filter(|text| !text.is_empty())
        .ok_or_else(|| ScrapeError::parse("<document>", "page has no title"))
}

/// Text content with whitespace runs collapsed
fn element_text(element: ElementRef) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn strip_quotes(text: &str) -> String {
    text.trim().trim_matches('"').trim().to_string()
}

/// Reads `album: <b>"Title"</b> (1981)`: the title from the first `<b>`, the
/// year from the text node right after it
fn title_and_year(
    header: ElementRef,
    bold: &Selector,
) -> std::result::Result<(String, Option<i32>), String> {
    let b = header
        .select(bold)
        .next()
        .ok_or_else(|| format!("album header '{}' has no title", element_text(header)))?;
    let title = strip_quotes(&element_text(b));
    if title.is_empty() {
        return Err("album header has an empty title".to_string());
    }

    let after: String = b
        .next_sibling()
        .and_then(|node| node.value().as_text().map(|text| (**text).to_string()))
        .unwrap_or_default();

    Ok((title, parse_year(&after)?))
}

/// Extracts the single four-digit year of a fragment like ` (1981)`
fn parse_year(fragment: &str) -> std::result::Result<Option<i32>, String> {
    let numbers: Vec<&str> = fragment
        .split(|c: char| !c.is_ascii_digit())
        .filter(|part| !part.is_empty())
        .collect();

    match numbers.as_slice() {
        [] => Ok(None),
        [year] if year.len() == 4 => year
            .parse()
            .map(Some)
            .map_err(|e| format!("invalid year '{}': {}", year, e)),
        [year] => Err(format!("year '{}' does not have four digits", year)),
        _ => Err(format!("ambiguous album year in '{}'", fragment.trim())),
    }
}

/// Song links between an album header and the next one
fn songs_after_header(header: ElementRef, link: &Selector, page_url: &Url) -> Vec<CatalogSong> {
    let mut songs = Vec::new();
    for node in header.next_siblings() {
        let Some(element) = ElementRef::wrap(node) else {
            continue;
        };
        if element.value().name() == "div" && element.value().classes().any(|c| c == "album") {
            break;
        }

        let anchors: Vec<ElementRef> = if element.value().attr("href").is_some() {
            vec![element]
        } else {
            element.select(link).collect()
        };

        for anchor in anchors {
            let title = element_text(anchor);
            let url = anchor
                .value()
                .attr("href")
                .and_then(|href| page_url.join(href.trim()).ok());
            if let (false, Some(url)) = (title.is_empty(), url) {
                songs.push(CatalogSong {
                    title,
                    url: url.to_string(),
                });
            }
        }
    }
    songs
}
