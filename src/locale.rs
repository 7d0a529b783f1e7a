use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Ja,
    En,
}

/// Fixed strings shown by the add-task dialog.
pub struct DialogText {
    pub title: &'static str,
    pub name: &'static str,
    pub start: &'static str,
    pub duration: &'static str,
    pub color: &'static str,
    pub submit: &'static str,
    pub cancel: &'static str,
    pub name_required: &'static str,
}

const JA: DialogText = DialogText {
    title: "新しいタスクを追加",
    name: "タスク名",
    start: "開始時間",
    duration: "期間（時間）",
    color: "色",
    submit: "追加",
    cancel: "キャンセル",
    name_required: "タスク名を入力してください",
};

const EN: DialogText = DialogText {
    title: "Add a new task",
    name: "Task name",
    start: "Start hour",
    duration: "Duration (hours)",
    color: "Color",
    submit: "Add",
    cancel: "Cancel",
    name_required: "Enter a task name",
};

impl Locale {
    pub fn dialog(&self) -> &'static DialogText {
        match self {
            Locale::Ja => &JA,
            Locale::En => &EN,
        }
    }

    pub fn format_date(&self, date: NaiveDate) -> String {
        match self {
            Locale::Ja => format!(
                "{}月{}日({})",
                date.month(),
                date.day(),
                ja_weekday(date.weekday())
            ),
            Locale::En => date.format("%a, %b %-d").to_string(),
        }
    }
}

fn ja_weekday(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "月",
        Weekday::Tue => "火",
        Weekday::Wed => "水",
        Weekday::Thu => "木",
        Weekday::Fri => "金",
        Weekday::Sat => "土",
        Weekday::Sun => "日",
    }
}
