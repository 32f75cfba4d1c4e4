//! Capability-scoped evaluator for parsed snippets
//!
//! The only effects a snippet can have are toolbox calls, `print`, `sleep` and
//! bindings in its [`Namespace`]. There is no access to host state.

use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::{Map, Number, Value};
use std::time::Duration;
use tracing::{debug, info};

use super::ScriptError;
use super::ast::{Call, Expr, Stmt, StmtKind};
use super::namespace::Namespace;
use super::parser::parse_program;
use crate::tools::Toolbox;

/// Longest pause a snippet may request with `sleep()`
const MAX_SLEEP_SECS: f64 = 60.0;

pub struct Interpreter<'a> {
    toolbox: &'a Toolbox,
    output: Vec<String>,
}

impl<'a> Interpreter<'a> {
    pub fn new(toolbox: &'a Toolbox) -> Self {
        Self {
            toolbox,
            output: Vec::new(),
        }
    }

    /// Parse `source` completely, then run it statement by statement.
    ///
    /// A parse error runs nothing. A runtime error stops at the failing
    /// statement; bindings made by earlier statements stay in `namespace`.
    /// A `done()` call does not stop execution.
    pub async fn run(&mut self, source: &str, namespace: &mut Namespace) -> Result<(), ScriptError> {
        let program = parse_program(source)?;
        debug!("Parsed {} statements", program.statements.len());

        for statement in &program.statements {
            self.execute(statement, namespace).await?;
        }
        Ok(())
    }

    /// Lines produced by `print` so far
    pub fn output(&self) -> &[String] {
        &self.output
    }

    pub fn into_output(self) -> Vec<String> {
        self.output
    }

    async fn execute(&mut self, statement: &Stmt, namespace: &mut Namespace) -> Result<(), ScriptError> {
        match &statement.kind {
            StmtKind::Assign { name, value } => {
                let value = self.eval(value, namespace).await?;
                namespace.set(name, value)?;
            }
            StmtKind::AddAssign { name, value } => {
                let current = namespace
                    .get(name)
                    .cloned()
                    .ok_or_else(|| ScriptError::UndefinedVariable(name.clone()))?;
                let rhs = self.eval(value, namespace).await?;
                namespace.set(name, add(current, rhs)?)?;
            }
            StmtKind::Expr(expr) => {
                self.eval(expr, namespace).await?;
            }
        }
        Ok(())
    }

    fn eval<'s>(&'s mut self, expr: &'s Expr, namespace: &'s Namespace) -> BoxFuture<'s, Result<Value, ScriptError>> {
        async move {
            match expr {
                Expr::Literal(value) => Ok(value.clone()),
                Expr::Array(items) => {
                    let mut values = Vec::with_capacity(items.len());
                    for item in items {
                        values.push(self.eval(item, namespace).await?);
                    }
                    Ok(Value::Array(values))
                }
                Expr::Object(entries) => {
                    let mut map = Map::new();
                    for (key, item) in entries {
                        let value = self.eval(item, namespace).await?;
                        map.insert(key.clone(), value);
                    }
                    Ok(Value::Object(map))
                }
                Expr::Var(name) => namespace.get(name).cloned().ok_or_else(|| {
                    if Namespace::is_reserved(name) {
                        ScriptError::Type(format!("built-in '{}' must be called, not used as a value", name))
                    } else {
                        ScriptError::UndefinedVariable(name.clone())
                    }
                }),
                Expr::Member(target, field) => {
                    let value = self.eval(target, namespace).await?;
                    member(&value, field)
                }
                Expr::Index(target, index) => {
                    let value = self.eval(target, namespace).await?;
                    let index = self.eval(index, namespace).await?;
                    subscript(&value, &index)
                }
                Expr::Neg(inner) => {
                    let value = self.eval(inner, namespace).await?;
                    negate(value)
                }
                Expr::Sum(terms) => {
                    let mut total: Option<Value> = None;
                    for term in terms {
                        let value = self.eval(term, namespace).await?;
                        total = Some(match total {
                            Some(left) => add(left, value)?,
                            None => value,
                        });
                    }
                    Ok(total.unwrap_or(Value::Null))
                }
                Expr::Call(call) => self.call(call, namespace).await,
            }
        }
        .boxed()
    }

    async fn call(&mut self, call: &Call, namespace: &Namespace) -> Result<Value, ScriptError> {
        let mut positional = Vec::with_capacity(call.args.len());
        for arg in &call.args {
            positional.push(self.eval(arg, namespace).await?);
        }
        let mut keywords = Vec::with_capacity(call.kwargs.len());
        for (name, arg) in &call.kwargs {
            keywords.push((name.clone(), self.eval(arg, namespace).await?));
        }
        let mut args = Arguments::new(&call.function, positional, keywords);

        match call.function.as_str() {
            "navigate" => {
                let url = args.string(0, &["url"])?;
                args.finish(1)?;
                self.toolbox.navigate(&url).await?;
                Ok(Value::Null)
            }
            "click" => {
                let index = args.required(0, &["index"])?;
                args.finish(1)?;
                self.toolbox.click(&index).await?;
                Ok(Value::Null)
            }
            "input_text" => {
                let index = args.required(0, &["index"])?;
                let text = args.text(1, &["text"])?;
                args.finish(2)?;
                self.toolbox.input_text(&index, &text).await?;
                Ok(Value::Null)
            }
            "evaluate" => {
                let script = args.string(0, &["script", "code"])?;
                let variables = args.optional(1, &["variables", "params"]);
                args.finish(2)?;
                if let Some(v) = &variables
                    && !matches!(v, Value::Object(_) | Value::Null)
                {
                    return Err(args.invalid(format!("variables must be an object, got {}", type_name(v))));
                }
                Ok(self.toolbox.evaluate(&script, variables.as_ref()).await?)
            }
            "get_element" => {
                let index = args.required(0, &["index"])?;
                let depth = match args.optional(1, &["depth", "level"]) {
                    None => 1,
                    Some(v) => v
                        .as_u64()
                        .and_then(|d| u32::try_from(d).ok())
                        .ok_or_else(|| args.invalid(format!("depth must be a non-negative integer, got {}", v)))?,
                };
                args.finish(2)?;
                Ok(self.toolbox.get_element(&index, depth).await?)
            }
            "done" => {
                let result = args.required(0, &["result"])?;
                args.finish(1)?;
                info!("Done signal received");
                self.toolbox.done(result);
                Ok(Value::Null)
            }
            "print" => {
                args.finish_keywords()?;
                let line = args
                    .positional
                    .iter()
                    .flatten()
                    .map(display)
                    .collect::<Vec<_>>()
                    .join(" ");
                info!("print: {}", line);
                self.output.push(line);
                Ok(Value::Null)
            }
            "sleep" => {
                let seconds = args.required(0, &["seconds"])?;
                args.finish(1)?;
                let secs = seconds
                    .as_f64()
                    .filter(|s| (0.0..=MAX_SLEEP_SECS).contains(s))
                    .ok_or_else(|| {
                        args.invalid(format!("seconds must be a number between 0 and {}", MAX_SLEEP_SECS))
                    })?;
                tokio::time::sleep(Duration::from_secs_f64(secs)).await;
                Ok(Value::Null)
            }
            "len" => {
                let value = args.required(0, &["value"])?;
                args.finish(1)?;
                let len = match &value {
                    Value::Array(items) => items.len(),
                    Value::String(s) => s.chars().count(),
                    Value::Object(map) => map.len(),
                    other => {
                        return Err(ScriptError::Type(format!("object of type {} has no len()", type_name(other))));
                    }
                };
                Ok(Value::from(len))
            }
            other if namespace.contains(other) => {
                Err(ScriptError::Type(format!("'{}' is a {}, not a function", other, type_name_of(namespace, other))))
            }
            other => Err(ScriptError::UnknownFunction(other.to_string())),
        }
    }
}

fn type_name_of(namespace: &Namespace, name: &str) -> &'static str {
    namespace.get(name).map(type_name).unwrap_or("value")
}

/// Evaluated call arguments, consumed by position or keyword
struct Arguments {
    function: String,
    positional: Vec<Option<Value>>,
    keywords: Vec<(String, Value)>,
}

impl Arguments {
    fn new(function: &str, positional: Vec<Value>, keywords: Vec<(String, Value)>) -> Self {
        Self {
            function: function.to_string(),
            positional: positional.into_iter().map(Some).collect(),
            keywords,
        }
    }

    fn invalid(&self, message: impl Into<String>) -> ScriptError {
        ScriptError::Argument {
            function: self.function.clone(),
            message: message.into(),
        }
    }

    fn optional(&mut self, position: usize, names: &[&str]) -> Option<Value> {
        if let Some(value) = self.positional.get_mut(position).and_then(Option::take) {
            return Some(value);
        }
        let found = self.keywords.iter().position(|(k, _)| names.contains(&k.as_str()))?;
        Some(self.keywords.remove(found).1)
    }

    fn required(&mut self, position: usize, names: &[&str]) -> Result<Value, ScriptError> {
        self.optional(position, names)
            .ok_or_else(|| self.invalid(format!("missing required argument '{}'", names[0])))
    }

    fn string(&mut self, position: usize, names: &[&str]) -> Result<String, ScriptError> {
        match self.required(position, names)? {
            Value::String(s) => Ok(s),
            other => Err(self.invalid(format!("'{}' must be a string, got {}", names[0], type_name(&other)))),
        }
    }

    /// Like `string`, but numbers and booleans are accepted as their text
    fn text(&mut self, position: usize, names: &[&str]) -> Result<String, ScriptError> {
        match self.required(position, names)? {
            Value::String(s) => Ok(s),
            v @ (Value::Number(_) | Value::Bool(_)) => Ok(v.to_string()),
            other => Err(self.invalid(format!("'{}' must be a string, got {}", names[0], type_name(&other)))),
        }
    }

    fn finish_keywords(&self) -> Result<(), ScriptError> {
        match self.keywords.first() {
            Some((name, _)) => Err(self.invalid(format!("got an unexpected keyword argument '{}'", name))),
            None => Ok(()),
        }
    }

    /// Reject leftovers: extra positional arguments or unknown keywords
    fn finish(&self, arity: usize) -> Result<(), ScriptError> {
        if self.positional.len() > arity {
            return Err(self.invalid(format!(
                "takes {} positional argument(s) but {} were given",
                arity,
                self.positional.len()
            )));
        }
        self.finish_keywords()
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Text form used by `print` and string concatenation
fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn member(value: &Value, field: &str) -> Result<Value, ScriptError> {
    match (value, field) {
        (Value::Object(map), _) => Ok(map.get(field).cloned().unwrap_or(Value::Null)),
        (Value::Array(items), "length") => Ok(Value::from(items.len())),
        (Value::String(s), "length") => Ok(Value::from(s.chars().count())),
        (other, _) => Err(ScriptError::Type(format!(
            "cannot read property '{}' of {}",
            field,
            type_name(other)
        ))),
    }
}

fn subscript(value: &Value, index: &Value) -> Result<Value, ScriptError> {
    match (value, index) {
        (Value::Object(map), Value::String(key)) => Ok(map.get(key).cloned().unwrap_or(Value::Null)),
        (Value::Array(items), Value::Number(n)) => {
            let i = position(n, items.len())?;
            Ok(items[i].clone())
        }
        (Value::String(s), Value::Number(n)) => {
            let chars: Vec<char> = s.chars().collect();
            let i = position(n, chars.len())?;
            Ok(Value::String(chars[i].to_string()))
        }
        (target, index) => Err(ScriptError::Type(format!(
            "cannot index {} with {}",
            type_name(target),
            type_name(index)
        ))),
    }
}

/// Resolve an integer index, counting negative values from the end
fn position(n: &Number, len: usize) -> Result<usize, ScriptError> {
    let out_of_range = || ScriptError::Type(format!("index {} out of range for length {}", n, len));
    let i = n.as_i64().ok_or_else(out_of_range)?;
    let resolved = if i < 0 { len as i64 + i } else { i };
    usize::try_from(resolved)
        .ok()
        .filter(|&r| r < len)
        .ok_or_else(out_of_range)
}

fn negate(value: Value) -> Result<Value, ScriptError> {
    match &value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64().and_then(i64::checked_neg) {
                return Ok(Value::from(i));
            }
            n.as_f64()
                .and_then(|f| Number::from_f64(-f))
                .map(Value::Number)
                .ok_or_else(|| ScriptError::Type(format!("cannot negate {}", n)))
        }
        other => Err(ScriptError::Type(format!("bad operand type for unary -: {}", type_name(other)))),
    }
}

/// `+`: numbers add, strings concatenate (scalars coerce), arrays concatenate, objects merge
fn add(left: Value, right: Value) -> Result<Value, ScriptError> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => {
            if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64())
                && let Some(sum) = x.checked_add(y)
            {
                return Ok(Value::from(sum));
            }
            let sum = a.as_f64().unwrap_or(f64::NAN) + b.as_f64().unwrap_or(f64::NAN);
            Number::from_f64(sum)
                .map(Value::Number)
                .ok_or_else(|| ScriptError::Type(format!("{} + {} is not a finite number", a, b)))
        }
        (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),
        (Value::String(a), b @ (Value::Number(_) | Value::Bool(_) | Value::Null)) => {
            Ok(Value::String(a + &display(&b)))
        }
        (a @ (Value::Number(_) | Value::Bool(_) | Value::Null), Value::String(b)) => {
            Ok(Value::String(display(&a) + &b))
        }
        (Value::Array(mut a), Value::Array(b)) => {
            a.extend(b);
            Ok(Value::Array(a))
        }
        (Value::Object(mut a), Value::Object(b)) => {
            a.extend(b);
            Ok(Value::Object(a))
        }
        (a, b) => Err(ScriptError::Type(format!(
            "unsupported operand types for +: {} and {}",
            type_name(&a),
            type_name(&b)
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolError;
    use crate::tools::test_support::*;
    use serde_json::json;
    use std::sync::Arc;

    fn toolbox(driver: Arc<RecordingDriver>) -> Toolbox {
        Toolbox::with_timing(driver, indexed_handles(), Duration::ZERO, Duration::ZERO)
    }

    async fn run(source: &str, namespace: &mut Namespace) -> (Result<(), ScriptError>, Vec<String>) {
        let driver = Arc::new(RecordingDriver::default());
        let tb = toolbox(driver);
        let mut interpreter = Interpreter::new(&tb);
        let result = interpreter.run(source, namespace).await;
        (result, interpreter.into_output())
    }

    #[tokio::test]
    async fn variables_survive_a_failing_snippet() {
        let mut ns = Namespace::new();
        let (result, _) = run("products = ['a']\nclick(99)\nproducts = []", &mut ns).await;

        assert!(matches!(
            result,
            Err(ScriptError::Tool(ToolError::UnknownIndex { index: 99 }))
        ));
        assert_eq!(ns.get("products"), Some(&json!(["a"])));

        let (result, _) = run("products += ['b']\nprint(len(products))", &mut ns).await;
        assert!(result.is_ok());
        assert_eq!(ns.get("products"), Some(&json!(["a", "b"])));
    }

    #[tokio::test]
    async fn parse_errors_run_nothing() {
        let driver = Arc::new(RecordingDriver::default());
        let tb = toolbox(driver.clone());
        let mut ns = Namespace::new();

        let result = Interpreter::new(&tb)
            .run("x = 1\nclick(0)\ny = (", &mut ns)
            .await;

        assert!(matches!(result, Err(ScriptError::Parse { .. })));
        assert!(ns.is_empty());
        assert!(driver.calls().is_empty());
    }

    #[tokio::test]
    async fn statements_after_done_still_run() {
        let driver = Arc::new(RecordingDriver::default());
        let tb = toolbox(driver.clone());
        let mut ns = Namespace::new();

        Interpreter::new(&tb)
            .run("done({'n': 1})\nafter = true\ndone({'n': 2})", &mut ns)
            .await
            .unwrap();

        assert_eq!(ns.get("after"), Some(&json!(true)));
        assert_eq!(tb.result(), Some(json!({"n": 2})));
    }

    #[tokio::test]
    async fn toolbox_calls_reach_the_page() {
        let driver = Arc::new(RecordingDriver::default());
        *driver.evaluate_result.lock() = Some(Ok(json!("Example Domain")));
        let tb = toolbox(driver.clone());
        let mut ns = Namespace::new();

        let source = r#"
            await navigate("https://example.com")
            title = await evaluate("document.title")
            done({"title": title})
        "#;
        Interpreter::new(&tb).run(source, &mut ns).await.unwrap();

        let calls = driver.calls();
        assert_eq!(calls[0], "navigate https://example.com");
        assert!(calls[2].starts_with("eval "));
        assert_eq!(tb.result(), Some(json!({"title": "Example Domain"})));
    }

    #[tokio::test]
    async fn keyword_arguments_and_aliases() {
        let driver = Arc::new(RecordingDriver::default());
        let tb = Toolbox::with_timing(driver.clone(), indexed_handles(), Duration::ZERO, Duration::ZERO);
        let mut ns = Namespace::new();

        let source = "info = get_element(index='[i_0]', level=3)\ninput_text(1, text=42)\nevaluate(code='params.a', params={'a': 1})";
        Interpreter::new(&tb).run(source, &mut ns).await.unwrap();

        assert_eq!(ns.get("info").map(|v| &v["tag"]), Some(&json!("button")));
        let calls = driver.calls();
        assert_eq!(calls[0], "describe 10 3");
        assert_eq!(calls[1..3], ["click 11".to_string(), "keys 42".to_string()]);
        assert!(calls[3].ends_with("({\"a\":1})"));
    }

    #[tokio::test]
    async fn print_output_is_collected() {
        let mut ns = Namespace::new();
        let (result, output) = run("x = {'a': [1, 2]}\nprint('items:', x.a, x.a.length)\nprint(x['a'][-1] + 1)", &mut ns).await;
        result.unwrap();
        assert_eq!(output, vec!["items: [1,2] 2", "3"]);
    }

    #[tokio::test]
    async fn runtime_errors() {
        let mut ns = Namespace::new();

        let (result, _) = run("missing + 1", &mut ns).await;
        assert!(matches!(result, Err(ScriptError::UndefinedVariable(name)) if name == "missing"));

        let (result, _) = run("fetch('x')", &mut ns).await;
        assert!(matches!(result, Err(ScriptError::UnknownFunction(name)) if name == "fetch"));

        let (result, _) = run("click(0, 1)", &mut ns).await;
        assert!(matches!(result, Err(ScriptError::Argument { .. })));

        let (result, _) = run("navigate(url=1)", &mut ns).await;
        assert!(matches!(result, Err(ScriptError::Argument { .. })));

        let (result, _) = run("x = [1] + 'a'", &mut ns).await;
        assert!(matches!(result, Err(ScriptError::Type(_))));

        let (result, _) = run("x = click", &mut ns).await;
        assert!(matches!(result, Err(ScriptError::Type(_))));
    }

    #[test]
    fn addition_rules() {
        assert_eq!(add(json!(1), json!(2)).unwrap(), json!(3));
        assert_eq!(add(json!(1.5), json!(1)).unwrap(), json!(2.5));
        assert_eq!(add(json!("Page "), json!(2)).unwrap(), json!("Page 2"));
        assert_eq!(add(json!([1]), json!([2])).unwrap(), json!([1, 2]));
        assert_eq!(
            add(json!({"a": 1, "b": 1}), json!({"b": 2})).unwrap(),
            json!({"a": 1, "b": 2})
        );
        assert!(add(json!({}), json!([])).is_err());
    }

    #[test]
    fn indexing_rules() {
        assert_eq!(subscript(&json!([1, 2, 3]), &json!(-1)).unwrap(), json!(3));
        assert!(subscript(&json!([1]), &json!(5)).is_err());
        assert_eq!(subscript(&json!({"a": 1}), &json!("b")).unwrap(), json!(null));
        assert_eq!(subscript(&json!("héllo"), &json!(1)).unwrap(), json!("é"));
        assert_eq!(member(&json!({"a": 1}), "a").unwrap(), json!(1));
        assert!(member(&json!(1), "a").is_err());
    }
}
