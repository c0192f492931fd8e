//! Built-in time announcement table.

use crate::types::Language;

use super::manifest::FixedPrompt;

const HOURS: std::ops::Range<u32> = 0..24;
const MINUTES: std::ops::Range<u32> = 0..60;
const DAYS: std::ops::RangeInclusive<u32> = 1..=31;
const YEARS: std::ops::RangeInclusive<u32> = 2025..=2035;

const MONTHS_DE: [&str; 12] = [
    "Januar", "Februar", "März", "April", "Mai", "Juni", "Juli", "August", "September", "Oktober",
    "November", "Dezember",
];
const MONTHS_EN: [&str; 12] = [
    "January", "February", "March", "April", "May", "June", "July", "August", "September",
    "October", "November", "December",
];
const WEEKDAYS_DE: [&str; 7] = [
    "Sonntag", "Montag", "Dienstag", "Mittwoch", "Donnerstag", "Freitag", "Samstag",
];
const WEEKDAYS_EN: [&str; 7] = [
    "Sunday", "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday",
];

struct Table {
    language: Language,
    voice: &'static str,
    months: &'static [&'static str; 12],
    weekdays: &'static [&'static str; 7],
    /// German reads "1." as an ordinal.
    ordinal_suffix: &'static str,
    specials: &'static [(&'static str, &'static str)],
}

const TABLES: [Table; 2] = [
    Table {
        language: Language::DE,
        voice: "de_DE-thorsten-high.onnx",
        months: &MONTHS_DE,
        weekdays: &WEEKDAYS_DE,
        ordinal_suffix: ".",
        specials: &[
            ("uhr", "Uhr"),
            ("intro", "Es ist"),
            ("date_intro", "Heute ist"),
            ("dst_summer", "Sommerzeit"),
            ("dst_winter", "Winterzeit"),
        ],
    },
    Table {
        language: Language::EN,
        voice: "en_GB-jenny_dioco-medium.onnx",
        months: &MONTHS_EN,
        weekdays: &WEEKDAYS_EN,
        ordinal_suffix: "",
        specials: &[
            ("intro", "It is"),
            ("date_intro", "Today is"),
            ("dst_summer", "Summer time"),
            ("dst_winter", "Winter time"),
        ],
    },
];

/// Returns the time announcements for every listed language that has a table.
///
/// Files land under `time/<lang>/`: `h_<H>`, `m_<MM>`, `day_<D>`,
/// `month_<0-11>`, `wday_<0-6>` (Sunday first), `year_<YYYY>` plus the
/// framing phrases (`intro`, `date_intro`, `dst_summer`, `dst_winter` and
/// German `uhr`).
pub fn time_announcements(languages: &[Language]) -> Vec<FixedPrompt> {
    let mut prompts = Vec::new();

    for table in TABLES.iter().filter(|t| languages.contains(&t.language)) {
        let lang = table.language;
        let add = |prompts: &mut Vec<FixedPrompt>, name: String, text: String| {
            prompts.push(FixedPrompt::new(
                format!("time/{}/{}.wav", lang, name),
                text,
                lang,
                Some(table.voice),
            ));
        };

        for h in HOURS {
            add(&mut prompts, format!("h_{}", h), h.to_string());
        }
        for m in MINUTES {
            add(&mut prompts, format!("m_{:02}", m), m.to_string());
        }
        for d in DAYS {
            add(&mut prompts, format!("day_{}", d), format!("{}{}", d, table.ordinal_suffix));
        }
        for (i, month) in table.months.iter().enumerate() {
            add(&mut prompts, format!("month_{}", i), month.to_string());
        }
        for (i, weekday) in table.weekdays.iter().enumerate() {
            add(&mut prompts, format!("wday_{}", i), weekday.to_string());
        }
        for y in YEARS {
            add(&mut prompts, format!("year_{}", y), y.to_string());
        }
        for (name, text) in table.specials {
            add(&mut prompts, name.to_string(), text.to_string());
        }
    }

    prompts
}
