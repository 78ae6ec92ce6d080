//! Response rendering.
//!
//! Handlers return a [`HandlerOutput`]. On routes marked JSON every output is
//! wrapped in the envelope
//!
//! ```json
//! {"status": "success", "code": 200, "args": {...}, "data": ...}
//! ```
//!
//! where `data` is the model for views, `{count, result}` for sequences and
//! the raw value otherwise. Other routes write text verbatim and forward
//! views to the [`ViewRenderer`](crate::ViewRenderer); any other output is
//! an unsupported return type.

use crate::traits::ViewRenderer;
use crate::{Error, HttpResponse};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value as Json};
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// A logical view name plus the model exposed to it
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ModelView {
    view: String,
    data: Map<String, Json>,
}

impl ModelView {
    pub fn new(view: impl Into<String>) -> Self {
        Self {
            view: view.into(),
            data: Map::new(),
        }
    }

    pub fn add_item(mut self, key: impl Into<String>, value: impl Into<Json>) -> Self {
        self.set_item(key, value);
        self
    }

    pub fn set_item(&mut self, key: impl Into<String>, value: impl Into<Json>) {
        self.data.insert(key.into(), value.into());
    }

    /// Add any serializable value to the model
    pub fn add_serialized<T: Serialize>(self, key: impl Into<String>, value: &T) -> Result<Self, Error> {
        let json = serde_json::to_value(value).map_err(|e| Error::Serialization(e.to_string()))?;
        Ok(self.add_item(key, json))
    }

    pub fn view(&self) -> &str {
        &self.view
    }

    pub fn data(&self) -> &Map<String, Json> {
        &self.data
    }
}

/// What a handler returns
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerOutput {
    Text(String),
    View(ModelView),
    Sequence(Vec<Json>),
    Data(Json),
}

impl HandlerOutput {
    pub fn text(text: impl Into<String>) -> Self {
        HandlerOutput::Text(text.into())
    }

    pub fn view(view: ModelView) -> Self {
        HandlerOutput::View(view)
    }

    pub fn sequence<T: Serialize>(items: &[T]) -> Result<Self, Error> {
        items
            .iter()
            .map(|item| serde_json::to_value(item).map_err(|e| Error::Serialization(e.to_string())))
            .collect::<Result<Vec<_>, _>>()
            .map(HandlerOutput::Sequence)
    }

    pub fn data<T: Serialize>(value: &T) -> Result<Self, Error> {
        serde_json::to_value(value)
            .map(HandlerOutput::Data)
            .map_err(|e| Error::Serialization(e.to_string()))
    }

    fn label(&self) -> &'static str {
        match self {
            HandlerOutput::Text(_) => "text",
            HandlerOutput::View(_) => "view",
            HandlerOutput::Sequence(_) => "sequence",
            HandlerOutput::Data(_) => "data",
        }
    }
}

/// Request to hand a view over to the view renderer
#[derive(Debug, Clone, PartialEq)]
pub struct Forward {
    /// Logical view name as returned by the handler
    pub view: String,
    /// View prefix joined with the view name
    pub path: String,
    pub attributes: Map<String, Json>,
}

/// Dispatch result: a finished response or a forward to a view
#[derive(Debug, Clone, PartialEq)]
pub enum Rendered {
    Response(HttpResponse),
    Forward(Forward),
}

impl Rendered {
    pub fn status(&self) -> u16 {
        match self {
            Rendered::Response(response) => response.status,
            Rendered::Forward(_) => 200,
        }
    }

    pub fn response(&self) -> Option<&HttpResponse> {
        match self {
            Rendered::Response(response) => Some(response),
            Rendered::Forward(_) => None,
        }
    }

    pub fn forward(&self) -> Option<&Forward> {
        match self {
            Rendered::Forward(forward) => Some(forward),
            Rendered::Response(_) => None,
        }
    }
}

#[derive(Serialize)]
struct Envelope<'a> {
    status: &'static str,
    code: u16,
    args: &'a Map<String, Json>,
    data: Json,
}

/// Turns handler output into a [`Rendered`]
#[derive(Debug, Clone)]
pub struct ResponseRenderer {
    text_content_type: String,
    view_prefix: String,
}

impl ResponseRenderer {
    pub fn new(text_content_type: impl Into<String>, view_prefix: impl Into<String>) -> Self {
        Self {
            text_content_type: text_content_type.into(),
            view_prefix: view_prefix.into(),
        }
    }

    /// `args` holds the resolved arguments by parameter name, in declaration order
    pub fn render(&self, output: HandlerOutput, json: bool, args: &Map<String, Json>) -> Result<Rendered, Error> {
        if json {
            let data = match output {
                HandlerOutput::View(mv) => Json::Object(mv.data),
                HandlerOutput::Sequence(items) => serde_json::json!({
                    "count": items.len(),
                    "result": items,
                }),
                HandlerOutput::Data(value) => value,
                HandlerOutput::Text(text) => Json::String(text),
            };
            let envelope = Envelope {
                status: "success",
                code: 200,
                args,
                data,
            };
            return HttpResponse::ok().with_json(&envelope).map(Rendered::Response);
        }

        match output {
            HandlerOutput::Text(text) => Ok(Rendered::Response(
                HttpResponse::ok().with_text(text, &self.text_content_type),
            )),
            HandlerOutput::View(mv) => {
                let path = format!("{}{}", self.view_prefix, mv.view);
                debug!(view = %mv.view, path = %path, "Forwarding to view");
                Ok(Rendered::Forward(Forward {
                    view: mv.view,
                    path,
                    attributes: mv.data,
                }))
            }
            other => Err(Error::UnsupportedReturnType(format!(
                "{} output requires a JSON route",
                other.label()
            ))),
        }
    }
}

/// Serves forwarded views as files below a root directory, verbatim
#[derive(Debug, Clone)]
pub struct FileViewRenderer {
    root: PathBuf,
    content_type: String,
}

impl FileViewRenderer {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            content_type: "text/html; charset=UTF-8".to_string(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    fn resolve(&self, view_path: &str) -> Option<PathBuf> {
        let relative = Path::new(view_path.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return None;
        }
        Some(self.root.join(relative))
    }
}

#[async_trait]
impl ViewRenderer for FileViewRenderer {
    async fn render(&self, forward: &Forward) -> Result<HttpResponse, Error> {
        let path = self
            .resolve(&forward.path)
            .ok_or_else(|| Error::ViewNotFound(forward.path.clone()))?;
        match tokio::fs::read(&path).await {
            Ok(body) => Ok(HttpResponse::ok()
                .with_body(body)
                .with_header("Content-Type".to_string(), self.content_type.clone())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::ViewNotFound(forward.path.clone()))
            }
            Err(e) => Err(Error::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn renderer() -> ResponseRenderer {
        ResponseRenderer::new("text/html; charset=UTF-8", "/views/")
    }

    fn body(rendered: &Rendered) -> String {
        rendered.response().unwrap().body_string()
    }

    #[test]
    fn test_text_is_written_verbatim() {
        let rendered = renderer()
            .render(HandlerOutput::text("<p>hi</p>"), false, &Map::new())
            .unwrap();
        let response = rendered.response().unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body_string(), "<p>hi</p>");
        assert_eq!(response.header("content-type"), Some("text/html; charset=UTF-8"));
    }

    #[test]
    fn test_view_is_forwarded() {
        let mv = ModelView::new("user.jsp")
            .add_item("name", "Alice")
            .add_item("age", 30);
        let rendered = renderer()
            .render(HandlerOutput::view(mv), false, &Map::new())
            .unwrap();

        let forward = rendered.forward().unwrap();
        assert_eq!(forward.view, "user.jsp");
        assert_eq!(forward.path, "/views/user.jsp");
        assert_eq!(forward.attributes["name"], json!("Alice"));
        assert_eq!(forward.attributes["age"], json!(30));
    }

    #[test]
    fn test_envelope_for_sequence() {
        let mut args = Map::new();
        args.insert("id".into(), json!("7"));
        let output = HandlerOutput::sequence(&["a", "b", "c"]).unwrap();

        let rendered = renderer().render(output, true, &args).unwrap();
        assert_eq!(
            body(&rendered),
            r#"{"status":"success","code":200,"args":{"id":"7"},"data":{"count":3,"result":["a","b","c"]}}"#
        );
    }

    #[test]
    fn test_envelope_for_view_uses_model() {
        let mv = ModelView::new("ignored").add_item("total", 12);
        let rendered = renderer()
            .render(HandlerOutput::view(mv), true, &Map::new())
            .unwrap();
        let parsed: Json = serde_json::from_str(&body(&rendered)).unwrap();
        assert_eq!(parsed["data"], json!({"total": 12}));
        assert_eq!(parsed["args"], json!({}));
    }

    #[test]
    fn test_envelope_keeps_nulls_and_arg_order() {
        let mut args = Map::new();
        args.insert("z".into(), Json::Null);
        args.insert("a".into(), json!(0));
        let rendered = renderer()
            .render(HandlerOutput::Data(Json::Null), true, &args)
            .unwrap();
        assert_eq!(
            body(&rendered),
            r#"{"status":"success","code":200,"args":{"z":null,"a":0},"data":null}"#
        );
    }

    #[test]
    fn test_unsupported_output_without_json() {
        let err = renderer()
            .render(HandlerOutput::Data(json!({"x": 1})), false, &Map::new())
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedReturnType(_)));
        assert_eq!(err.status_code(), 500);
    }

    #[tokio::test]
    async fn test_file_view_renderer() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("views")).unwrap();
        std::fs::write(dir.path().join("views/home.html"), "<h1>Home</h1>").unwrap();
        let views = FileViewRenderer::new(dir.path());

        let forward = Forward {
            view: "home.html".into(),
            path: "/views/home.html".into(),
            attributes: Map::new(),
        };
        let response = views.render(&forward).await.unwrap();
        assert_eq!(response.body_string(), "<h1>Home</h1>");

        let missing = Forward {
            path: "/views/missing.html".into(),
            ..forward.clone()
        };
        assert!(matches!(views.render(&missing).await, Err(Error::ViewNotFound(_))));

        let escape = Forward {
            path: "/views/../../etc/passwd".into(),
            ..forward
        };
        assert!(matches!(views.render(&escape).await, Err(Error::ViewNotFound(_))));
    }
}
