use minijinja::{context, Environment};

use crate::pipeline::search::search::{MAX_RESULT_COUNT, MIN_RESULT_COUNT};
use crate::session::SessionState;

const INDEX_TEMPLATE: &str = include_str!("templates/index.html");
const BUSY_TEMPLATE: &str = include_str!("templates/busy.html");

pub fn templates() -> Result<Environment<'static>, minijinja::Error> {
    let mut env = Environment::new();
    env.add_template("index.html", INDEX_TEMPLATE)?;
    env.add_template("busy.html", BUSY_TEMPLATE)?;
    Ok(env)
}

pub fn render_index(env: &Environment<'_>, session: &SessionState) -> Result<String, minijinja::Error> {
    let failures: Vec<String> = session.failures.iter().map(ToString::to_string).collect();

    env.get_template("index.html")?.render(context! {
        notice => &session.notice,
        keyword => &session.keyword,
        k => session.k,
        min_k => MIN_RESULT_COUNT,
        max_k => MAX_RESULT_COUNT,
        failures => &failures,
        has_responses => session.has_responses(),
        all_content => session.all_content(),
        overall_summary => &session.overall_summary,
        downloads => session.downloads,
    })
}

/// Shown while another request of the same session is still running.
pub fn render_busy(env: &Environment<'_>) -> Result<String, minijinja::Error> {
    env.get_template("busy.html")?.render(context! {})
}
