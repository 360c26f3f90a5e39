/*
Simple i18n helper for the backend.

This module provides:
- A tiny embedded translations store for DE/EN (compile-time embedded JSON).
- A simple `tr` function to lookup translations by key + optional params.
- A `t` convenience wrapper using the default language (DEFAULT_LANG).

Usage:
    use crate::i18n;
    let msg = i18n::t("error.slot_unavailable");
    let body = i18n::tr(Some("en"), "email.reminder.subject", Some(&[("date", "09.03.2026")]));

Notes:
- Placeholders in translation strings use single-brace format: `{name}`.
- Default language is `de`. If a key is missing for the requested language,
  the fallback language will be used.
*/

use std::collections::HashMap;
use std::sync::OnceLock;

pub const DEFAULT_LANG: &str = "de";

static TRANSLATIONS: OnceLock<HashMap<String, HashMap<String, String>>> = OnceLock::new();

const DE_JSON: &str = r#"
{
  "bad_request.range_required": "Parameter \"from\" und \"to\" erforderlich",
  "bad_request.invalid_date": "Ungültiges Datumsformat (YYYY-MM-DD erwartet): {value}",
  "bad_request.invalid_time": "Ungültige Uhrzeit (HH:MM erwartet): {value}",
  "bad_request.range_order": "\"from\" darf nicht nach \"to\" liegen",
  "bad_request.all_fields_required": "Alle Felder sind erforderlich",
  "bad_request.ambiguous_slot": "Entweder ruleId oder eventId angeben, nicht beides",
  "bad_request.invalid_email": "Ungültige E-Mail-Adresse",
  "bad_request.name_too_long": "Name ist zu lang",
  "bad_request.invalid_json": "Ungültiger Request-Body: {err}",
  "bad_request.no_changes": "Keine Änderungen angegeben",
  "bad_request.date_required": "Datum erforderlich",
  "bad_request.email_type": "Typ muss \"intro\" oder \"reminder\" sein",
  "validation.days_empty": "Mindestens ein Wochentag ist erforderlich",
  "validation.day_of_week": "Ungültiger Wochentag: {day} (1 = Montag … 7 = Sonntag)",
  "validation.duplicate_day": "Wochentag {day} ist mehrfach angegeben",
  "validation.duration": "Die Dauer muss größer als 0 Minuten sein",
  "validation.end_before_start": "Das Enddatum liegt vor dem Startdatum",
  "validation.status_transition": "Eine stornierte Buchung kann nicht wieder bestätigt werden",
  "validation.flag_reset": "Versandmarkierungen können nicht zurückgesetzt werden",
  "not_found.rule": "Regel nicht gefunden",
  "not_found.event": "Einzeltermin nicht gefunden",
  "not_found.booking": "Buchung nicht gefunden",
  "error.slot_unavailable": "Dieser Termin ist nicht mehr verfügbar",
  "error.notifier_failed": "E-Mail konnte nicht gesendet werden",
  "auth.invalid_token": "Token ungültig oder abgelaufen",
  "booking.created": "Termin erfolgreich gebucht",
  "booking.updated": "Buchung aktualisiert",
  "booking.email_sent": "E-Mail gesendet",
  "rule.created": "Regel angelegt",
  "rule.updated": "Regel aktualisiert",
  "rule.deleted": "Regel gelöscht",
  "event.created": "Einzeltermin angelegt",
  "event.deleted": "Einzeltermin gelöscht",
  "email.confirmation.subject": "Terminbestätigung – {practice}",
  "email.confirmation.body": "Hallo {name},\n\nvielen Dank für Ihre Buchung. Ihr Termin wurde bestätigt:\n\nDatum: {date}\nUhrzeit: {time} Uhr\nDauer: {duration} Minuten\n\nWir freuen uns auf Sie!\n\nMit freundlichen Grüßen\n{practice}\n{site}",
  "email.intro.subject": "Ihr Termin bei {practice}",
  "email.intro.body": "Hallo {name},\n\nvielen Dank für Ihre Buchung.\n\nIhr Termin:\nDatum: {date}\nUhrzeit: {time} Uhr\nDauer: {duration} Minuten\n\nWir freuen uns auf Sie!\n\nMit freundlichen Grüßen\n{practice}\n{site}",
  "email.reminder.subject": "Erinnerung: Ihr Termin am {date}",
  "email.reminder.body": "Hallo {name},\n\ndies ist eine freundliche Erinnerung an Ihren bevorstehenden Termin.\n\nDatum: {date}\nUhrzeit: {time} Uhr\nDauer: {duration} Minuten\n\nWir freuen uns auf Sie!\n\nMit freundlichen Grüßen\n{practice}\n{site}",
  "app.name": "Terminbuchung"
}
"#;

const EN_JSON: &str = r#"
{
  "bad_request.range_required": "Parameters \"from\" and \"to\" are required",
  "bad_request.invalid_date": "Invalid date format (expected YYYY-MM-DD): {value}",
  "bad_request.invalid_time": "Invalid time of day (expected HH:MM): {value}",
  "bad_request.range_order": "\"from\" must not be after \"to\"",
  "bad_request.all_fields_required": "All fields are required",
  "bad_request.ambiguous_slot": "Provide either ruleId or eventId, not both",
  "bad_request.invalid_email": "Invalid email address",
  "bad_request.name_too_long": "Name is too long",
  "bad_request.invalid_json": "Invalid request body: {err}",
  "bad_request.no_changes": "No changes given",
  "bad_request.date_required": "Date is required",
  "bad_request.email_type": "Type must be \"intro\" or \"reminder\"",
  "validation.days_empty": "At least one weekday is required",
  "validation.day_of_week": "Invalid weekday: {day} (1 = Monday … 7 = Sunday)",
  "validation.duplicate_day": "Weekday {day} is given more than once",
  "validation.duration": "Duration must be greater than 0 minutes",
  "validation.end_before_start": "End date is before start date",
  "validation.status_transition": "A cancelled booking cannot be confirmed again",
  "validation.flag_reset": "Email flags cannot be reset",
  "not_found.rule": "Rule not found",
  "not_found.event": "Event not found",
  "not_found.booking": "Booking not found",
  "error.slot_unavailable": "This slot is no longer available",
  "error.notifier_failed": "Email could not be sent",
  "auth.invalid_token": "Invalid or expired token",
  "booking.created": "Appointment booked",
  "booking.updated": "Booking updated",
  "booking.email_sent": "Email sent",
  "rule.created": "Rule created",
  "rule.updated": "Rule updated",
  "rule.deleted": "Rule deleted",
  "event.created": "Event created",
  "event.deleted": "Event deleted",
  "email.confirmation.subject": "Appointment confirmation – {practice}",
  "email.confirmation.body": "Hello {name},\n\nthank you for your booking. Your appointment is confirmed:\n\nDate: {date}\nTime: {time}\nDuration: {duration} minutes\n\nWe look forward to seeing you!\n\nKind regards\n{practice}\n{site}",
  "email.intro.subject": "Your appointment with {practice}",
  "email.intro.body": "Hello {name},\n\nthank you for your booking.\n\nYour appointment:\nDate: {date}\nTime: {time}\nDuration: {duration} minutes\n\nWe look forward to seeing you!\n\nKind regards\n{practice}\n{site}",
  "email.reminder.subject": "Reminder: your appointment on {date}",
  "email.reminder.body": "Hello {name},\n\nthis is a friendly reminder of your upcoming appointment.\n\nDate: {date}\nTime: {time}\nDuration: {duration} minutes\n\nWe look forward to seeing you!\n\nKind regards\n{practice}\n{site}",
  "app.name": "Appointment booking"
}
"#;

/// Initialize translations map (lazy).
fn build_translations() -> HashMap<String, HashMap<String, String>> {
    let mut out: HashMap<String, HashMap<String, String>> = HashMap::new();

    let de_map: HashMap<String, String> = serde_json::from_str(DE_JSON).unwrap_or_else(|e| {
        panic!("failed to parse DE_JSON in i18n module: {}", e);
    });
    out.insert("de".to_string(), de_map);

    let en_map: HashMap<String, String> = serde_json::from_str(EN_JSON).unwrap_or_else(|e| {
        panic!("failed to parse EN_JSON in i18n module: {}", e);
    });
    out.insert("en".to_string(), en_map);

    out
}

/// Returns the global translations map (lang -> (key -> message)).
fn translations() -> &'static HashMap<String, HashMap<String, String>> {
    TRANSLATIONS.get_or_init(build_translations)
}

/// Normalize a language tag into a short, lowercase code (e.g. "en-US" -> "en").
pub fn normalize_language(lang: &str) -> String {
    lang.split('-').next().unwrap_or(lang).to_lowercase()
}

/// Returns true if the given language code is supported (e.g. "de", "en").
pub fn is_supported_language(lang: &str) -> bool {
    translations().contains_key(lang)
}

/// Translate a key using an explicit language (or default if None).
///
/// Falls back to the default language, then to the key itself, so a missing
/// entry is still visible in logs and responses.
pub fn tr(lang: Option<&str>, key: &str, params: Option<&[(&str, &str)]>) -> String {
    let map = translations();

    let desired = lang.unwrap_or(DEFAULT_LANG);

    let val = map
        .get(desired)
        .and_then(|m| m.get(key))
        .cloned()
        .or_else(|| map.get(DEFAULT_LANG).and_then(|m| m.get(key)).cloned())
        .unwrap_or_else(|| key.to_string());

    match params {
        Some(params) => fill_placeholders(&val, params),
        None => val,
    }
}

/// Replace `{key}` placeholders in one pass over the template. Substituted
/// values are copied verbatim, so text that looks like a placeholder inside a
/// value (e.g. a client name) is never expanded. Unknown placeholders stay.
fn fill_placeholders(template: &str, params: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                let name = &after[..close];
                match params.iter().find(|(k, _)| *k == name) {
                    Some((_, value)) => out.push_str(value),
                    None => {
                        out.push('{');
                        out.push_str(name);
                        out.push('}');
                    }
                }
                rest = &after[close + 1..];
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// Convenience wrapper: translate using default language (DEFAULT_LANG).
pub fn t(key: &str) -> String {
    tr(None, key, None)
}

/// Convenience wrapper with params (default language).
pub fn t_with(key: &str, params: &[(&str, &str)]) -> String {
    tr(None, key, Some(params))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tr_basic() {
        let s = tr(Some("de"), "error.slot_unavailable", None);
        assert!(s.contains("nicht mehr verfügbar"));
    }

    #[test]
    fn test_t_with_params() {
        let s = t_with(
            "email.confirmation.body",
            &[
                ("name", "Max"),
                ("date", "09.03.2026"),
                ("time", "10:00"),
                ("duration", "50"),
                ("practice", "Praxis"),
                ("site", "https://example.com"),
            ],
        );
        assert!(s.contains("Hallo Max"));
        assert!(s.contains("09.03.2026"));
        assert!(!s.contains('{'));
    }

    #[test]
    fn substituted_values_are_not_expanded_again() {
        let s = t_with(
            "email.confirmation.body",
            &[
                ("name", "{site}"),
                ("date", "09.03.2026"),
                ("time", "10:00"),
                ("duration", "50"),
                ("practice", "Praxis"),
                ("site", "https://example.com"),
            ],
        );
        assert!(s.starts_with("Hallo {site},"));
        assert!(s.ends_with("Praxis\nhttps://example.com"));
    }

    #[test]
    fn unknown_and_unclosed_placeholders_are_kept() {
        assert_eq!(fill_placeholders("{a} {b} {c", &[("a", "1")]), "1 {b} {c");
    }

    #[test]
    fn test_fallback_to_default() {
        let s = tr(Some("fr"), "not_found.rule", None);
        assert_eq!(s, "Regel nicht gefunden");
    }

    #[test]
    fn missing_key_returns_key() {
        let k = "non.existent.key";
        assert_eq!(t(k), k.to_string());
    }

    #[test]
    fn languages_share_the_same_keys() {
        let map = translations();
        let de = &map["de"];
        let en = &map["en"];
        for key in de.keys() {
            assert!(en.contains_key(key), "missing EN translation for {}", key);
        }
        assert_eq!(de.len(), en.len());
    }

    #[test]
    fn test_is_supported_language() {
        assert!(is_supported_language("de"));
        assert!(is_supported_language("en"));
        assert!(!is_supported_language("fr"));
    }

    #[test]
    fn test_normalize_language() {
        assert_eq!(normalize_language("en-US"), "en");
        assert_eq!(normalize_language("DE-at"), "de");
    }
}
