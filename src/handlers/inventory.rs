use axum::{
    extract::{Query, State},
    response::Html,
};
use askama::Template;
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use tower_cookies::Cookies;

use crate::{
    error::AppError,
    filters,
    handlers::{current_balances, render, BalanceRow, LedgerRow},
    ledger,
    middleware::authorize,
    models::View,
    report::{categories, daily_split, filter_balances, search_ledger, LedgerSums},
    state::AppState,
};

#[derive(Deserialize, Default)]
pub struct MaterialsQuery {
    #[serde(default)]
    q: String,
    #[serde(default)]
    category: String,
}

impl MaterialsQuery {
    pub(crate) fn category(&self) -> Option<&str> {
        Some(self.category.as_str()).filter(|c| !c.trim().is_empty())
    }

    pub(crate) fn query(&self) -> Option<&str> {
        Some(self.q.as_str()).filter(|q| !q.trim().is_empty())
    }

    /// Query string that reproduces this filter, for the export link.
    pub fn to_query_string(&self) -> String {
        format!(
            "q={}&category={}",
            urlencoding::encode(&self.q),
            urlencoding::encode(&self.category)
        )
    }
}

#[derive(Template)]
#[template(path = "materials.html")]
struct MaterialsTemplate {
    is_admin: bool,
    rows: Vec<BalanceRow>,
    categories: Vec<String>,
    selected_category: String,
    q: String,
    export_href: String,
}

pub async fn materials(
    State(state): State<AppState>,
    cookies: Cookies,
    Query(params): Query<MaterialsQuery>,
) -> Result<Html<String>, AppError> {
    let role = authorize(&cookies, &state, View::Materials)?;

    let balances = current_balances(&state).await?;
    let shown = filter_balances(&balances, params.category(), params.query());

    let template = MaterialsTemplate {
        is_admin: role.is_admin(),
        rows: shown.iter().map(BalanceRow::from).collect(),
        categories: categories(&balances),
        selected_category: params.category.clone(),
        q: params.q.clone(),
        export_href: format!("/export/materials.csv?{}", params.to_query_string()),
    };

    render(&template)
}

#[derive(Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    q: String,
}

#[derive(Template)]
#[template(path = "search.html")]
struct SearchTemplate {
    is_admin: bool,
    q: String,
    searched: bool,
    /// viewer: one card per matching item
    cards: Vec<BalanceRow>,
    /// admin: every matching ledger line
    history: Vec<LedgerRow>,
    sums: LedgerSums,
}

pub async fn search(
    State(state): State<AppState>,
    cookies: Cookies,
    Query(params): Query<SearchQuery>,
) -> Result<Html<String>, AppError> {
    let role = authorize(&cookies, &state, View::ItemSearch)?;
    let query = params.q.trim();
    let searched = !query.is_empty();

    let mut template = SearchTemplate {
        is_admin: role.is_admin(),
        q: params.q.clone(),
        searched,
        cards: Vec::new(),
        history: Vec::new(),
        sums: LedgerSums::default(),
    };

    if searched {
        if role.can(View::LedgerHistory) {
            let records = ledger::load_all(&state.db).await?;
            let hits = search_ledger(&records, query);
            template.sums = LedgerSums::of(hits.iter().copied());
            template.history = hits.into_iter().map(LedgerRow::from).collect();
        } else {
            let balances = current_balances(&state).await?;
            template.cards = filter_balances(&balances, None, Some(query))
                .iter()
                .map(BalanceRow::from)
                .collect();
        }
    }

    render(&template)
}

#[derive(Deserialize)]
pub struct DailyQuery {
    date: Option<String>,
    all: Option<String>,
}

impl DailyQuery {
    /// `None` means every day.
    fn day(&self, today: NaiveDate) -> Result<Option<NaiveDate>, AppError> {
        let all = self
            .all
            .as_deref()
            .map(|v| matches!(v.trim(), "1" | "true" | "on" | "yes"))
            .unwrap_or(false);
        if all {
            return Ok(None);
        }

        match self.date.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
            Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map(Some)
                .map_err(|_| AppError::BadRequest(format!("invalid date {:?}", raw))),
            None => Ok(Some(today)),
        }
    }
}

#[derive(Template)]
#[template(path = "daily.html")]
struct DailyTemplate {
    is_admin: bool,
    date: String,
    all: bool,
    received: Vec<LedgerRow>,
    issued: Vec<LedgerRow>,
    sums: LedgerSums,
    export_href: String,
}

pub async fn daily(
    State(state): State<AppState>,
    cookies: Cookies,
    Query(params): Query<DailyQuery>,
) -> Result<Html<String>, AppError> {
    let role = authorize(&cookies, &state, View::DailyReport)?;
    let today = Local::now().date_naive();
    let day = params.day(today)?;

    let records = ledger::load_all(&state.db).await?;
    let (received, issued) = daily_split(&records, day);
    let sums = LedgerSums::of(received.iter().chain(issued.iter()).copied());

    let template = DailyTemplate {
        is_admin: role.is_admin(),
        date: day.unwrap_or(today).to_string(),
        all: day.is_none(),
        received: received.into_iter().map(LedgerRow::from).collect(),
        issued: issued.into_iter().map(LedgerRow::from).collect(),
        sums,
        export_href: match day {
            Some(d) => format!("/export/ledger.csv?date={}", d),
            None => "/export/ledger.csv".to_string(),
        },
    };

    render(&template)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn daily_query_defaults_to_today() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let q = DailyQuery { date: None, all: None };
        assert_eq!(q.day(today).unwrap(), Some(today));

        let q = DailyQuery { date: Some("2024-02-29".to_string()), all: None };
        assert_eq!(q.day(today).unwrap(), NaiveDate::from_ymd_opt(2024, 2, 29));

        let q = DailyQuery { date: Some("2024-02-29".to_string()), all: Some("1".to_string()) };
        assert_eq!(q.day(today).unwrap(), None);

        let q = DailyQuery { date: Some("29/02".to_string()), all: None };
        assert!(matches!(q.day(today), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn export_link_keeps_filters() {
        let q = MaterialsQuery { q: "ถุง มือ".to_string(), category: "PPE".to_string() };
        assert_eq!(
            q.to_query_string(),
            "q=%E0%B8%96%E0%B8%B8%E0%B8%87%20%E0%B8%A1%E0%B8%B7%E0%B8%AD&category=PPE"
        );
    }
}
