//! HTML views.
//!
//! Pages are deliberately plain: one layout, a form per flow, and a handful of
//! result and error pages.

use axum::{
    extract::rejection::FormRejection,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use std::fmt::Write;
use zipweather_core::{
    AddConfirmation, DeleteConfirmation, RowConditions, ServiceError, WatchlistTable,
    WeatherRecord,
};

/// The flow a request belongs to; selects which error page a failure renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Search,
    Add,
    ViewWatchlist,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPage {
    Zip,
    Add,
    ViewWatchlist,
    Delete,
    Unavailable,
}

impl ErrorPage {
    fn title(&self) -> &'static str {
        match self {
            ErrorPage::Zip => "Invalid ZIP code",
            ErrorPage::Add => "Could not add to watchlist",
            ErrorPage::ViewWatchlist => "Watchlist not found",
            ErrorPage::Delete => "Could not delete from watchlist",
            ErrorPage::Unavailable => "Service unavailable",
        }
    }
}

#[derive(Debug, Clone)]
pub enum View {
    Home,
    Search,
    Add,
    ChooseWatchlist,
    Delete,
    SearchResults(WeatherRecord),
    AddConfirmation(AddConfirmation),
    Watchlist(WatchlistTable),
    DeleteConfirmation(DeleteConfirmation),
    Error {
        page: ErrorPage,
        status: StatusCode,
        message: String,
    },
}

impl View {
    /// Map a failed flow to its error page.
    pub fn error(flow: Flow, err: &ServiceError) -> Self {
        let (page, status) = match err {
            ServiceError::InvalidZip(_) => (ErrorPage::Zip, StatusCode::UNPROCESSABLE_ENTITY),
            ServiceError::WeatherUnavailable { .. } => (ErrorPage::Zip, StatusCode::BAD_GATEWAY),
            ServiceError::Store(_) => (ErrorPage::Unavailable, StatusCode::SERVICE_UNAVAILABLE),
            ServiceError::MissingUsername => (flow_page(flow), StatusCode::UNPROCESSABLE_ENTITY),
            ServiceError::UserNotFound { .. }
            | ServiceError::EmptyWatchlist { .. }
            | ServiceError::ZipNotInWatchlist { .. } => (flow_page(flow), StatusCode::NOT_FOUND),
        };

        match err {
            ServiceError::Store(source) => {
                tracing::error!(?flow, error = %source, "request failed on the watchlist store");
            }
            ServiceError::WeatherUnavailable { zip, source } => {
                tracing::warn!(?flow, %zip, error = %source, "weather lookup failed");
            }
            _ => tracing::info!(?flow, error = %err, "request rejected"),
        }

        View::Error {
            page,
            status,
            message: err.to_string(),
        }
    }

    /// A request body the form extractor could not decode.
    pub fn rejected(flow: Flow, rejection: &FormRejection) -> Self {
        tracing::info!(?flow, error = %rejection, "form rejected");
        View::Error {
            page: flow_page(flow),
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            View::Error { status, .. } => *status,
            _ => StatusCode::OK,
        }
    }

    pub fn render(&self) -> String {
        match self {
            View::Home => layout(
                "Weather Watchlist",
                r#"<ul>
<li><a href="/search">Search weather by ZIP code</a></li>
<li><a href="/add">Add a ZIP code to a watchlist</a></li>
<li><a href="/choosewatchlist">View a watchlist</a></li>
<li><a href="/delete">Delete a ZIP code from a watchlist</a></li>
</ul>"#,
            ),
            View::Search => layout(
                "Search",
                &form("/searchresults", &[("zip", "ZIP code")], "Search"),
            ),
            View::Add => layout(
                "Add to watchlist",
                &form("/addconfirmation", &[("username", "Username"), ("zip", "ZIP code")], "Add"),
            ),
            View::ChooseWatchlist => layout(
                "View watchlist",
                &form("/viewwatchlist", &[("username", "Username")], "View"),
            ),
            View::Delete => layout(
                "Delete from watchlist",
                &form(
                    "/deleteconfirmation",
                    &[("username", "Username"), ("zip", "ZIP code")],
                    "Delete",
                ),
            ),
            View::SearchResults(record) => layout("Current weather", &results(record)),
            View::AddConfirmation(c) => layout(
                "Added",
                &format!(
                    "<p>Added {} to {}'s watchlist.</p>{HOME_LINK}",
                    escape(c.zip.as_str()),
                    escape(&c.username)
                ),
            ),
            View::Watchlist(table) => {
                layout(&format!("{}'s watchlist", table.username), &watchlist(table))
            }
            View::DeleteConfirmation(c) => layout(
                "Deleted",
                &format!(
                    "<p>Removed {} from {}'s watchlist.</p>{HOME_LINK}",
                    escape(c.zip.as_str()),
                    escape(&c.username)
                ),
            ),
            View::Error { page, message, .. } => layout(
                page.title(),
                &format!("<p class=\"error\">{}</p>{HOME_LINK}", escape(message)),
            ),
        }
    }
}

impl IntoResponse for View {
    fn into_response(self) -> Response {
        (self.status(), Html(self.render())).into_response()
    }
}

const HOME_LINK: &str = r#"<p><a href="/">Home</a></p>"#;

fn flow_page(flow: Flow) -> ErrorPage {
    match flow {
        Flow::Search => ErrorPage::Zip,
        Flow::Add => ErrorPage::Add,
        Flow::ViewWatchlist => ErrorPage::ViewWatchlist,
        Flow::Delete => ErrorPage::Delete,
    }
}

fn layout(title: &str, body: &str) -> String {
    let title = escape(title);
    format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>{title}</title></head>\n\
         <body>\n<h1>{title}</h1>\n{body}\n</body>\n</html>\n"
    )
}

fn form(action: &str, fields: &[(&str, &str)], submit: &str) -> String {
    let mut html = format!("<form method=\"post\" action=\"{action}\">\n");
    for (name, label) in fields {
        let _ = writeln!(
            html,
            "<label>{label} <input type=\"text\" name=\"{name}\" required></label><br>"
        );
    }
    let _ = write!(html, "<button type=\"submit\">{submit}</button>\n</form>\n{HOME_LINK}");
    html
}

fn results(record: &WeatherRecord) -> String {
    let temp = record.units.temperature_symbol();
    let mut html = String::new();
    let _ = writeln!(
        html,
        "<h2>{}, {} ({})</h2>",
        escape(&record.city),
        escape(&record.state),
        escape(record.zip.as_str())
    );
    if !record.icon_url.is_empty() {
        let _ = writeln!(html, "<img src=\"{}\" alt=\"\">", escape(&record.icon_url));
    }
    let _ = writeln!(html, "<p>{}</p>", escape(&record.description));
    let _ = writeln!(html, "<p>Temperature: {}{temp}</p>", record.temperature);
    let _ = writeln!(html, "<p>Feels like: {}{temp}</p>", record.feels_like);
    let _ = writeln!(
        html,
        "<p>Wind speed: {} {}</p>",
        record.wind_speed,
        record.units.speed_symbol()
    );
    if let Some(local) = record.local_time {
        let _ = writeln!(html, "<p>Local time: {}</p>", local.format("%Y-%m-%d %H:%M"));
    }
    html.push_str(HOME_LINK);
    html
}

fn watchlist(table: &WatchlistTable) -> String {
    let mut html = String::from(
        "<table>\n<tr><th>ZIP</th><th>City</th><th>State</th>\
         <th>Temperature</th><th>Description</th></tr>\n",
    );
    for row in &table.rows {
        let zip = escape(row.zip.as_str());
        match &row.conditions {
            RowConditions::Current {
                city,
                state,
                temperature,
                description,
            } => {
                let _ = writeln!(
                    html,
                    "<tr><td>{zip}</td><td>{}</td><td>{}</td>\
                     <td>{temperature}</td><td>{}</td></tr>",
                    escape(city),
                    escape(state),
                    escape(description)
                );
            }
            RowConditions::Unavailable { reason } => {
                let _ = writeln!(
                    html,
                    "<tr class=\"unavailable\"><td>{zip}</td><td colspan=\"4\">{}</td></tr>",
                    escape(reason)
                );
            }
        }
    }
    html.push_str("</table>\n");
    html.push_str(HOME_LINK);
    html
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use zipweather_core::{WatchlistRow, ZipCode, ZipError};

    fn zip(s: &str) -> ZipCode {
        ZipCode::parse(s).unwrap()
    }

    #[test]
    fn escape_neutralises_markup() {
        assert_eq!(
            escape("<b>\"Tom\" & 'Jerry'</b>"),
            "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;"
        );
    }

    #[test]
    fn zip_length_error_uses_zip_page() {
        let err = ServiceError::InvalidZip(ZipError::InvalidLength {
            input: "123".into(),
        });
        for flow in [Flow::Search, Flow::Add, Flow::Delete] {
            let view = View::error(flow, &err);
            assert!(matches!(view, View::Error { page: ErrorPage::Zip, .. }));
            assert_eq!(view.status(), StatusCode::UNPROCESSABLE_ENTITY);
            assert!(view.render().contains("123 has an invalid zip code length"));
        }
    }

    #[test]
    fn not_found_errors_use_the_flow_page() {
        let err = ServiceError::UserNotFound {
            username: "nobody".into(),
        };
        let view = View::error(Flow::ViewWatchlist, &err);
        assert!(matches!(view, View::Error { page: ErrorPage::ViewWatchlist, .. }));

        let view = View::error(Flow::Delete, &err);
        assert!(matches!(view, View::Error { page: ErrorPage::Delete, .. }));
        assert_eq!(view.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn watchlist_renders_one_row_per_zip() {
        let table = WatchlistTable {
            username: "terp".into(),
            rows: vec![
                WatchlistRow {
                    zip: zip("20742"),
                    conditions: RowConditions::Current {
                        city: "College Park".into(),
                        state: "Maryland".into(),
                        temperature: 72.0,
                        description: "Sunny".into(),
                    },
                },
                WatchlistRow::unavailable(zip("10001"), "weather currently unavailable"),
            ],
        };
        let html = View::Watchlist(table).render();

        assert_eq!(html.matches("<tr>").count() + html.matches("<tr class").count(), 3);
        let first = html.find("20742").unwrap();
        let second = html.find("10001").unwrap();
        assert!(first < second);
        assert!(html.contains("weather currently unavailable"));
    }

    #[test]
    fn confirmations_share_one_possessive_rendering() {
        let added = View::AddConfirmation(AddConfirmation {
            username: "terp".into(),
            zip: zip("20742"),
        })
        .render();
        let removed = View::DeleteConfirmation(DeleteConfirmation {
            username: "terp".into(),
            zip: zip("20742"),
        })
        .render();

        assert!(added.contains("Added 20742 to terp's watchlist."), "{added}");
        assert!(removed.contains("Removed 20742 from terp's watchlist."), "{removed}");
    }

    #[test]
    fn user_input_is_escaped_in_confirmations() {
        let view = View::AddConfirmation(AddConfirmation {
            username: "<script>".into(),
            zip: zip("20742"),
        });
        let html = view.render();
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }
}
