//! Calendar list fetching

use super::{CALENDAR_API_BASE, api};
use crate::error::ProviderError;
use crate::models::CalendarListEntry;

/// Fetch every calendar the user can at least read, paginating until
/// exhausted. Items without an id are skipped.
pub fn fetch_calendar_list(
    agent: &ureq::Agent,
    access_token: &str,
) -> Result<Vec<CalendarListEntry>, ProviderError> {
    let mut entries = Vec::new();
    let mut page_token: Option<String> = None;

    loop {
        let mut url = format!(
            "{}/users/me/calendarList?minAccessRole=reader",
            CALENDAR_API_BASE
        );
        if let Some(token) = &page_token {
            url.push_str(&format!("&pageToken={}", urlencoding::encode(token)));
        }

        let mut response = agent
            .get(&url)
            .header("Authorization", &format!("Bearer {}", access_token))
            .call()
            .map_err(ProviderError::from_request)?;

        let list: api::CalendarListResponse = response
            .body_mut()
            .read_json()
            .map_err(|e| ProviderError::Decode(e.to_string()))?;

        for item in list.items {
            if let Some(entry) = map_entry(item) {
                entries.push(entry);
            }
        }

        match list.next_page_token {
            Some(token) => page_token = Some(token),
            None => break,
        }
    }

    Ok(entries)
}

/// Map one provider item; `None` drops id-less items.
fn map_entry(item: api::CalendarListItem) -> Option<CalendarListEntry> {
    let id = item.id?;
    Some(CalendarListEntry {
        id,
        summary: item.summary.unwrap_or_default(),
        primary: item.primary.unwrap_or(false),
        access_role: item.access_role.unwrap_or_else(|| "reader".to_string()),
        background_color: item.background_color,
        foreground_color: item.foreground_color,
        // Provider omits the flag for calendars shown by default.
        selected: item.selected != Some(false),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_item(id: Option<&str>, selected: Option<bool>) -> api::CalendarListItem {
        api::CalendarListItem {
            id: id.map(String::from),
            summary: Some("Team".to_string()),
            primary: Some(false),
            access_role: Some("owner".to_string()),
            background_color: Some("#9fe1e7".to_string()),
            foreground_color: None,
            selected,
        }
    }

    #[test]
    fn test_map_entry_defaults_selected() {
        assert!(map_entry(make_item(Some("c1"), None)).unwrap().selected);
        assert!(map_entry(make_item(Some("c1"), Some(true))).unwrap().selected);
        assert!(!map_entry(make_item(Some("c1"), Some(false))).unwrap().selected);
    }

    #[test]
    fn test_map_entry_skips_missing_id() {
        assert!(map_entry(make_item(None, Some(true))).is_none());
    }

    #[test]
    fn test_calendar_list_response_parse() {
        let json = r##"{
            "items": [
                {
                    "id": "primary-cal",
                    "summary": "Personal",
                    "primary": true,
                    "accessRole": "owner",
                    "backgroundColor": "#16a765",
                    "foregroundColor": "#000000"
                }
            ],
            "nextPageToken": "p2"
        }"##;

        let resp: api::CalendarListResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.items.len(), 1);
        assert_eq!(resp.next_page_token.as_deref(), Some("p2"));
        assert_eq!(resp.items[0].access_role.as_deref(), Some("owner"));
    }
}
