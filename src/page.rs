//! A small model of fetched HTML pages and the forms on them. Forms are looked
//! up by what they do (their action) and their controls by name or value, never
//! by position.
use crate::error::{GrabError, Stage};
use anyhow::{Context, Result};
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use url::Url;

static FORM: LazyLock<Selector> = LazyLock::new(|| Selector::parse("form").unwrap());
static CONTROLS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("input, select, textarea, button").unwrap());
static OPTION: LazyLock<Selector> = LazyLock::new(|| Selector::parse("option").unwrap());

/// A fetched page: its final URL (after redirects) and raw body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub url: Url,
    pub body: String,
}

impl Page {
    pub fn new(url: Url, body: impl Into<String>) -> Self {
        Self {
            url,
            body: body.into(),
        }
    }

    pub fn html(&self) -> Html {
        Html::parse_document(&self.body)
    }

    /// Finds the first form whose action, resolved against this page, has the
    /// given path. Relative and absolute actions are treated alike.
    pub fn form_with_action(&self, stage: Stage, path: &str) -> Result<Form> {
        let html = self.html();
        for form in html.select(&FORM) {
            let action = form.value().attr("action").unwrap_or_default();
            let action = self
                .url
                .join(action)
                .with_context(|| format!("Invalid form action '{action}' on {stage}"))?;
            if action.path() == path {
                return Ok(Form::parse(stage, action, form));
            }
        }
        Err(GrabError::locator(stage, format!("form with action {path}")).into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKind {
    /// Anything sent as a plain name/value pair: text-like inputs, hidden
    /// inputs, selects and textareas.
    Field,
    Checkbox,
    Radio,
    /// A submit control, only sent when it is the one clicked.
    Button,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Control {
    pub name: String,
    pub kind: ControlKind,
    pub value: String,
    pub checked: bool,
}

/// The state of one form, owned by the workflow step that fills it in.
#[derive(Debug, Clone)]
pub struct Form {
    stage: Stage,
    pub action: Url,
    pub method: Method,
    pub controls: Vec<Control>,
}

/// Everything needed to send a filled-in form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub method: Method,
    pub url: Url,
    pub params: Vec<(String, String)>,
}

impl Form {
    fn parse(stage: Stage, action: Url, form: ElementRef) -> Self {
        let method = match form.value().attr("method") {
            Some(m) if m.eq_ignore_ascii_case("post") => Method::Post,
            _ => Method::Get,
        };
        let controls = form.select(&CONTROLS).filter_map(parse_control).collect();
        Self {
            stage,
            action,
            method,
            controls,
        }
    }

    fn missing(&self, locator: String) -> anyhow::Error {
        GrabError::locator(self.stage, locator).into()
    }

    /// Checks the first checkbox called `name`.
    pub fn check_named(&mut self, name: &str) -> Result<()> {
        let checkbox = self
            .controls
            .iter_mut()
            .find(|c| c.kind == ControlKind::Checkbox && c.name == name)
            .ok_or_else(|| GrabError::locator(self.stage, format!("checkbox named {name}")))?;
        checkbox.checked = true;
        Ok(())
    }

    /// Checks every checkbox carrying `value`, returning how many there were.
    pub fn check_by_value(&mut self, value: &str) -> Result<usize> {
        let mut count = 0;
        for checkbox in self
            .controls
            .iter_mut()
            .filter(|c| c.kind == ControlKind::Checkbox && c.value == value)
        {
            checkbox.checked = true;
            count += 1;
        }
        if count == 0 {
            return Err(self.missing(format!("checkbox with value {value}")));
        }
        Ok(count)
    }

    /// Sets the state of the `index`-th checkbox called `name`, counted in
    /// document order.
    pub fn set_checked_nth(&mut self, name: &str, index: usize, checked: bool) -> Result<()> {
        let checkbox = self
            .controls
            .iter_mut()
            .filter(|c| c.kind == ControlKind::Checkbox && c.name == name)
            .nth(index)
            .ok_or_else(|| GrabError::locator(self.stage, format!("checkbox {name} #{index}")))?;
        checkbox.checked = checked;
        Ok(())
    }

    pub fn set_field(&mut self, name: &str, value: impl Into<String>) -> Result<()> {
        let field = self
            .controls
            .iter_mut()
            .find(|c| c.kind == ControlKind::Field && c.name == name)
            .ok_or_else(|| GrabError::locator(self.stage, format!("field named {name}")))?;
        field.value = value.into();
        Ok(())
    }

    /// Builds the request a browser would send, optionally by clicking the
    /// submit button called `button`.
    pub fn submission(&self, button: Option<&str>) -> Result<Submission> {
        let mut params: Vec<(String, String)> = self
            .controls
            .iter()
            .filter(|c| match c.kind {
                ControlKind::Field => true,
                ControlKind::Checkbox | ControlKind::Radio => c.checked,
                ControlKind::Button => false,
            })
            .map(|c| (c.name.clone(), c.value.clone()))
            .collect();

        if let Some(button) = button {
            let clicked = self
                .controls
                .iter()
                .find(|c| c.kind == ControlKind::Button && c.name == button)
                .ok_or_else(|| self.missing(format!("button named {button}")))?;
            params.push((clicked.name.clone(), clicked.value.clone()));
        }

        let mut url = self.action.clone();
        url.set_fragment(None);
        if self.method == Method::Get {
            url.set_query(None);
        }

        Ok(Submission {
            method: self.method,
            url,
            params,
        })
    }
}

/// Whether `element` becomes a checkbox control called `name` when its form
/// is parsed.
pub fn is_checkbox_named(element: &ElementRef, name: &str) -> bool {
    let el = element.value();
    el.name() == "input"
        && el.attr("disabled").is_none()
        && el.attr("name") == Some(name)
        && el
            .attr("type")
            .is_some_and(|t| t.eq_ignore_ascii_case("checkbox"))
}

fn parse_control(element: ElementRef) -> Option<Control> {
    let el = element.value();
    if el.attr("disabled").is_some() {
        return None;
    }
    let name = el.attr("name").filter(|n| !n.is_empty())?.to_string();
    let attr_value = el.attr("value").unwrap_or_default().to_string();

    let (kind, value, checked) = match el.name() {
        "input" => {
            let input_type = el.attr("type").unwrap_or("text").to_ascii_lowercase();
            let checked = el.attr("checked").is_some();
            match input_type.as_str() {
                "checkbox" | "radio" => {
                    let kind = if input_type == "checkbox" {
                        ControlKind::Checkbox
                    } else {
                        ControlKind::Radio
                    };
                    let value = el.attr("value").unwrap_or("on").to_string();
                    (kind, value, checked)
                }
                "submit" | "image" => (ControlKind::Button, attr_value, false),
                "reset" | "button" | "file" => return None,
                _ => (ControlKind::Field, attr_value, false),
            }
        }
        "select" => (ControlKind::Field, selected_option(element), false),
        "textarea" => (ControlKind::Field, element.text().collect::<String>(), false),
        "button" => match el.attr("type").map(str::to_ascii_lowercase).as_deref() {
            None | Some("submit") => (ControlKind::Button, attr_value, false),
            _ => return None,
        },
        _ => return None,
    };

    Some(Control {
        name,
        kind,
        value,
        checked,
    })
}

fn selected_option(select: ElementRef) -> String {
    let options: Vec<ElementRef> = select.select(&OPTION).collect();
    let chosen = options
        .iter()
        .find(|o| o.value().attr("selected").is_some())
        .or_else(|| options.first());
    match chosen {
        Some(option) => match option.value().attr("value") {
            Some(value) => value.to_string(),
            None => option.text().collect::<String>().trim().to_string(),
        },
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEARCH_PAGE: &str = r#"
        <html><body>
          <form action="/cgi/other" method="post"><input name="x" value="1"></form>
          <form action="http://sdac.virtualsolar.org/cgi/vsoui" method="POST">
            <input type="checkbox" name="instrument" value="JSOC.SDO.AIA">
            <input type="checkbox" name="instrument" value="SOHO.EIT">
            <input type="checkbox" name="time" value="1" checked>
            <input type="hidden" name="version" value="current">
            <input type="text" name="disabled" value="x" disabled>
            <select name="startmonth">
              <option value="01">Jan</option>
              <option value="02" selected>Feb</option>
            </select>
            <select name="startday"><option>01</option></select>
            <textarea name="note">hi</textarea>
            <input type="reset" name="reset" value="Reset">
            <input type="submit" name="search" value="Search">
            <button name="alt">Alt</button>
          </form>
        </body></html>"#;

    fn page() -> Page {
        let url = Url::parse("http://sdac.virtualsolar.org/cgi/search?instrument=1").unwrap();
        Page::new(url, SEARCH_PAGE)
    }

    fn form() -> Form {
        page()
            .form_with_action(Stage::InstrumentAndDates, "/cgi/vsoui")
            .unwrap()
    }

    fn field<'a>(form: &'a Form, name: &str) -> Option<&'a str> {
        form.controls
            .iter()
            .find(|c| c.kind == ControlKind::Field && c.name == name)
            .map(|c| c.value.as_str())
    }

    #[test]
    fn test_form_located_by_action_path() {
        let form = form();
        assert_eq!(form.method, Method::Post);
        assert_eq!(form.action.as_str(), "http://sdac.virtualsolar.org/cgi/vsoui");
        assert_eq!(field(&form, "version"), Some("current"));
        assert_eq!(field(&form, "startmonth"), Some("02"));
        assert_eq!(field(&form, "startday"), Some("01"));
        assert_eq!(field(&form, "note"), Some("hi"));
        assert_eq!(field(&form, "disabled"), None);
        assert!(!form.controls.iter().any(|c| c.name == "reset"));
    }

    #[test]
    fn test_missing_form_is_locator_failure() {
        let err = page()
            .form_with_action(Stage::Cart, "/cgi/cartui")
            .unwrap_err();
        match err.downcast_ref::<GrabError>() {
            Some(GrabError::Locator { stage, locator }) => {
                assert_eq!(*stage, Stage::Cart);
                assert!(locator.contains("/cgi/cartui"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_submission_contains_checked_and_clicked_only() {
        let mut form = form();
        assert_eq!(form.check_by_value("JSOC.SDO.AIA").unwrap(), 1);
        form.set_field("startmonth", "03").unwrap();
        let submission = form.submission(Some("search")).unwrap();

        let pairs: Vec<(&str, &str)> = submission
            .params
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("instrument", "JSOC.SDO.AIA"),
                ("time", "1"),
                ("version", "current"),
                ("startmonth", "03"),
                ("startday", "01"),
                ("note", "hi"),
                ("search", "Search"),
            ]
        );
    }

    #[test]
    fn test_unknown_controls_are_locator_failures() {
        let mut form = form();
        assert!(form.set_field("endyear", "2013").is_err());
        assert!(form.check_by_value("NOPE").is_err());
        assert!(form.check_named("missing").is_err());
        assert!(form.set_checked_nth("instrument", 2, true).is_err());
        let err = form.submission(Some("requestdata")).unwrap_err();
        assert!(err.to_string().contains("button named requestdata"));
    }

    #[test]
    fn test_set_checked_nth_unchecks() {
        let mut form = form();
        form.set_checked_nth("time", 0, false).unwrap();
        let submission = form.submission(None).unwrap();
        assert!(!submission.params.iter().any(|(k, _)| k == "time"));
    }

    #[test]
    fn test_set_checked_nth_touches_one_control() {
        let body = r#"<form action="/cgi/vsoui" method="post">
            <input type="checkbox" name="data">
            <input type="checkbox" name="data" checked>
            <input type="checkbox" name="data">
        </form>"#;
        let page = Page::new(Url::parse("http://host/cgi/vsoui").unwrap(), body);
        let mut form = page.form_with_action(Stage::BandSelection, "/cgi/vsoui").unwrap();
        form.set_checked_nth("data", 0, true).unwrap();
        form.set_checked_nth("data", 1, false).unwrap();
        form.set_checked_nth("data", 2, false).unwrap();

        let checked: Vec<bool> = form.controls.iter().map(|c| c.checked).collect();
        assert_eq!(checked, vec![true, false, false]);
        assert_eq!(
            form.submission(None).unwrap().params,
            vec![("data".to_string(), "on".to_string())]
        );
    }

    #[test]
    fn test_get_form_drops_action_query() {
        let body = r#"<form action="/cgi/search?stale=1"><input type="checkbox" name="instrument"></form>"#;
        let page = Page::new(Url::parse("http://host/cgi/search").unwrap(), body);
        let mut form = page.form_with_action(Stage::SearchEntry, "/cgi/search").unwrap();
        form.check_named("instrument").unwrap();
        let submission = form.submission(None).unwrap();
        assert_eq!(submission.method, Method::Get);
        assert_eq!(submission.url.as_str(), "http://host/cgi/search");
        assert_eq!(
            submission.params,
            vec![("instrument".to_string(), "on".to_string())]
        );
    }
}
