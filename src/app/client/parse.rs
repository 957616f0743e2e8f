//! HTML scraping for Sharenite profile pages
//!
//! Pure functions over page bodies so they can be tested without a server.

use scraper::{ElementRef, Html, Selector};

use crate::app::models::{ListingPage, ListingRecord, RecordDetails};
use crate::constants::{selectors, sharenite};
use crate::errors::{FetchError, FetchResult};

fn selector(css: &str) -> FetchResult<Selector> {
    Selector::parse(css).map_err(|_| FetchError::Parse {
        reason: format!("invalid selector '{}'", css),
    })
}

fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Text following `marker` in `text`, trimmed
fn value_after<'a>(text: &'a str, marker: &str) -> Option<&'a str> {
    text.split_once(marker)
        .map(|(_, rest)| rest.trim())
        .filter(|rest| !rest.is_empty())
}

fn first_number(text: &str) -> Option<u64> {
    let digits: String = text
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Parse one page of a profile's game table
///
/// `profile_url` is the profile root (`…/profiles/<user>`) used to build each
/// record's detail URL; `page` is the 1-based page number that was fetched.
pub fn parse_listing_page(html: &str, profile_url: &str, page: u32) -> FetchResult<ListingPage> {
    let document = Html::parse_document(html);
    let row_selector = selector(selectors::GAME_ROW)?;
    let title_selector = selector(selectors::GAME_TITLE)?;
    let column_selector = selector(selectors::ACTIVITY_COLUMN)?;
    let activity_selector = selector(selectors::ACTIVITY)?;

    let mut records = Vec::new();
    for row in document.select(&row_selector) {
        let Some(id) = row
            .value()
            .attr("id")
            .map(|id| id.trim_start_matches(sharenite::GAME_ID_PREFIX))
        else {
            continue;
        };
        if id.is_empty() || id == sharenite::HEADER_ROW_ID {
            continue;
        }

        let title = row
            .select(&title_selector)
            .next()
            .map(text_of)
            .unwrap_or_default();
        if title.is_empty() {
            continue;
        }

        // Prefer the activity column; older layouts only carry the abbr
        let column = row.select(&column_selector).next();
        let scope = column.unwrap_or(row);
        let (last_activity, last_activity_date) = match scope.select(&activity_selector).next() {
            Some(abbr) => (
                text_of(abbr),
                abbr.value().attr("title").unwrap_or_default().trim().to_string(),
            ),
            None => (column.map(text_of).unwrap_or_default(), String::new()),
        };

        records.push(ListingRecord::new(
            id,
            title,
            last_activity,
            last_activity_date,
            format!("{}/games/{}", profile_url.trim_end_matches('/'), id),
        ));
    }

    let mut listing = ListingPage::new(records, has_next_page(&document, page)?);
    if let Some(total) = total_games(&document)? {
        listing = listing.with_total_games(total);
    }
    Ok(listing)
}

fn has_next_page(document: &Html, page: u32) -> FetchResult<bool> {
    let next_selector = selector(selectors::NEXT_PAGE)?;
    if document.select(&next_selector).next().is_some() {
        return Ok(true);
    }

    let link_selector = selector(selectors::PAGE_LINK)?;
    let last_page = document
        .select(&link_selector)
        .filter(|link| text_of(*link).contains(sharenite::LAST_PAGE_MARKER))
        .filter_map(|link| link.value().attr("href"))
        .filter_map(|href| value_after(href, "page=").and_then(first_number))
        .max();

    Ok(last_page.map(|last| u64::from(page) < last).unwrap_or(false))
}

fn total_games(document: &Html) -> FetchResult<Option<u64>> {
    let paragraph_selector = selector(selectors::PARAGRAPH)?;
    Ok(document
        .select(&paragraph_selector)
        .map(text_of)
        .find_map(|text| {
            value_after(&text, sharenite::TOTAL_GAMES_MARKER).and_then(first_number)
        }))
}

/// Parse a game's detail page
pub fn parse_detail_page(html: &str) -> FetchResult<RecordDetails> {
    let document = Html::parse_document(html);
    let muted_selector = selector(selectors::MUTED_TEXT)?;
    let label_selector = selector(selectors::LABEL)?;
    let activity_selector = selector(selectors::ACTIVITY)?;

    let muted: Vec<String> = document.select(&muted_selector).map(text_of).collect();

    let play_time = muted
        .iter()
        .find_map(|text| value_after(text, sharenite::PLAYTIME_MARKER))
        .map(str::to_string);

    let play_count = muted
        .iter()
        .find_map(|text| value_after(text, sharenite::PLAY_COUNT_MARKER))
        .and_then(first_number)
        .and_then(|count| u32::try_from(count).ok());

    let platform = muted
        .iter()
        .find(|text| text.contains(sharenite::PLATFORM_MARKER))
        .cloned();

    let labelled_timestamp = |marker: &str| {
        document
            .select(&label_selector)
            .filter(|label| text_of(*label).contains(marker))
            .filter_map(|label| label.parent().and_then(ElementRef::wrap))
            .find_map(|parent| {
                parent
                    .select(&activity_selector)
                    .next()
                    .and_then(|abbr| abbr.value().attr("title"))
                    .map(|title| title.trim().to_string())
            })
    };

    Ok(RecordDetails {
        play_time,
        play_count,
        platform,
        added: labelled_timestamp(sharenite::ADDED_MARKER),
        modified: labelled_timestamp(sharenite::MODIFIED_MARKER),
    })
}
