//! JavaScript script engine on QuickJS.
//!
//! A QuickJS runtime is not thread-safe, so one worker thread owns it and
//! takes jobs from a queue, one at a time. Every job gets a fresh context,
//! so globals never leak from one script into the next.

use std::sync::mpsc;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use relay_application::ports::{ScriptEngine, ScriptEngineError};
use relay_domain::{CONTEXT_BINDING, ScriptContext, ScriptExecutionResult, ScriptLanguage, ScriptSettings};
use rquickjs::{CatchResultExt, Context, Ctx, Runtime, Value};
use tokio::sync::oneshot;

use super::{finish, view_from_json};

struct Job {
    code: String,
    context: ScriptContext,
    reply: oneshot::Sender<ScriptExecutionResult>,
}

type Deadline = Arc<Mutex<Option<Instant>>>;

/// Runs JavaScript scripts on a dedicated QuickJS worker.
#[derive(Debug, Clone)]
pub struct JavaScriptEngine {
    jobs: mpsc::Sender<Job>,
}

impl JavaScriptEngine {
    /// Starts the worker thread and its runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread or the QuickJS runtime cannot be
    /// created.
    pub fn new(settings: &ScriptSettings) -> Result<Self, ScriptEngineError> {
        let (jobs, queue) = mpsc::channel::<Job>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), String>>();
        let settings = *settings;

        thread::Builder::new()
            .name("relay-js".to_string())
            .spawn(move || worker(&queue, settings, &ready_tx))
            .map_err(|e| startup_error(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self { jobs }),
            Ok(Err(message)) => Err(startup_error(message)),
            Err(_) => Err(startup_error("worker exited during startup".to_string())),
        }
    }
}

const fn startup_error(message: String) -> ScriptEngineError {
    ScriptEngineError::Startup {
        language: ScriptLanguage::JavaScript,
        message,
    }
}

fn worker(queue: &mpsc::Receiver<Job>, settings: ScriptSettings, ready: &mpsc::Sender<Result<(), String>>) {
    let runtime = match Runtime::new() {
        Ok(runtime) => runtime,
        Err(error) => {
            let _ = ready.send(Err(error.to_string()));
            return;
        }
    };
    runtime.set_memory_limit(settings.memory_limit_bytes);

    let deadline: Deadline = Arc::default();
    let watched = Arc::clone(&deadline);
    runtime.set_interrupt_handler(Some(Box::new(move || {
        watched
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some_and(|deadline| Instant::now() >= deadline)
    })));

    if ready.send(Ok(())).is_err() {
        return;
    }

    let budget = Duration::from_millis(settings.timeout_ms);
    while let Ok(job) = queue.recv() {
        *deadline.lock().unwrap_or_else(PoisonError::into_inner) = Some(Instant::now() + budget);
        let result = run_job(&runtime, &job.code, job.context, settings.timeout_ms);
        *deadline.lock().unwrap_or_else(PoisonError::into_inner) = None;
        runtime.run_gc();

        if job.reply.send(result).is_err() {
            tracing::debug!("script caller went away before the result was ready");
        }
    }
    tracing::debug!("JavaScript worker stopped");
}

fn run_job(runtime: &Runtime, code: &str, context: ScriptContext, timeout_ms: u64) -> ScriptExecutionResult {
    let started = Instant::now();
    let js_context = match Context::full(runtime) {
        Ok(js_context) => js_context,
        Err(error) => return ScriptExecutionResult::failure(context, error.to_string()),
    };

    let outcome = js_context.with(|ctx| evaluate(&ctx, code, &context));
    match outcome {
        Ok((view, return_value)) => finish(context, view_from_json(view), return_value),
        Err(_) if started.elapsed() >= Duration::from_millis(timeout_ms) => {
            ScriptExecutionResult::failure(context, format!("script exceeded {timeout_ms}ms"))
        }
        Err(error) => ScriptExecutionResult::failure(context, error),
    }
}

/// Binds `pm`, runs `code` and returns the final `pm` and the script's
/// completion value, both as JSON.
fn evaluate(
    ctx: &Ctx<'_>,
    code: &str,
    context: &ScriptContext,
) -> Result<(serde_json::Value, Option<serde_json::Value>), String> {
    let input = serde_json::to_string(&context.to_view()).map_err(|e| e.to_string())?;
    let pm = ctx.json_parse(input).map_err(|e| e.to_string())?;
    ctx.globals()
        .set(CONTEXT_BINDING, pm)
        .map_err(|e| e.to_string())?;

    let completion: Value<'_> = ctx
        .eval(code.as_bytes().to_vec())
        .catch(ctx)
        .map_err(|e| e.to_string())?;

    let pm: Value<'_> = ctx
        .globals()
        .get(CONTEXT_BINDING)
        .map_err(|e| e.to_string())?;
    let view = to_json(ctx, pm)?
        .ok_or_else(|| format!("{CONTEXT_BINDING} is not serializable"))?;
    let return_value = if completion.is_undefined() {
        None
    } else {
        to_json(ctx, completion)?
    };
    Ok((view, return_value))
}

fn to_json<'js>(ctx: &Ctx<'js>, value: Value<'js>) -> Result<Option<serde_json::Value>, String> {
    let Some(text) = ctx
        .json_stringify(value)
        .catch(ctx)
        .map_err(|e| e.to_string())?
    else {
        return Ok(None);
    };
    let text = text.to_string().map_err(|e| e.to_string())?;
    serde_json::from_str(&text).map(Some).map_err(|e| e.to_string())
}

#[async_trait]
impl ScriptEngine for JavaScriptEngine {
    fn language(&self) -> ScriptLanguage {
        ScriptLanguage::JavaScript
    }

    async fn run(&self, code: &str, context: ScriptContext) -> ScriptExecutionResult {
        let (reply, result) = oneshot::channel();
        let original = context.clone();
        let job = Job {
            code: code.to_string(),
            context,
            reply,
        };

        if self.jobs.send(job).is_err() {
            return ScriptExecutionResult::failure(original, "JavaScript worker is not running");
        }
        result
            .await
            .unwrap_or_else(|_| ScriptExecutionResult::failure(original, "JavaScript worker stopped"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use pretty_assertions::assert_eq;
    use relay_domain::{ApiResponse, Request};

    fn engine() -> JavaScriptEngine {
        JavaScriptEngine::new(&ScriptSettings::default()).expect("runtime")
    }

    fn context() -> ScriptContext {
        let mut environment = BTreeMap::new();
        environment.insert("host".to_string(), "api.test".to_string());
        ScriptContext::new(environment).with_request(Request::get("https://api.test/users"))
    }

    #[tokio::test]
    async fn test_mutates_request_and_variables() {
        let code = r#"
            pm.url = `https://${pm.environment.host}/v2/users`;
            pm.headers["X-Trace"] = "abc";
            pm.query.page = 2;
            pm.variables.token = "secret";
        "#;

        let result = engine().run(code, context()).await;

        assert!(result.is_success(), "{:?}", result.error());
        let ctx = result.context();
        assert_eq!(ctx.url(), Some("https://api.test/v2/users"));
        assert_eq!(ctx.headers().and_then(|h| h.get("X-Trace")).map(String::as_str), Some("abc"));
        assert_eq!(ctx.query().and_then(|q| q.get("page")).map(String::as_str), Some("2"));
        assert_eq!(ctx.variables().get("token").map(String::as_str), Some("secret"));
    }

    #[tokio::test]
    async fn test_returns_completion_value() {
        let result = engine().run("const a = { n: 1 }; a", context()).await;
        assert_eq!(result.return_value(), Some(&serde_json::json!({ "n": 1 })));

        let result = engine().run("let x = 1;", context()).await;
        assert_eq!(result.return_value(), None);
    }

    #[tokio::test]
    async fn test_throw_fails_with_original_context() {
        let original = context();
        let result = engine()
            .run("pm.url = 'changed'; throw new Error('bad token');", original.clone())
            .await;

        assert!(result.error().is_some_and(|e| e.contains("bad token")));
        assert_eq!(result.into_context(), original);
    }

    #[tokio::test]
    async fn test_globals_do_not_leak_between_runs() {
        let engine = engine();
        engine.run("globalThis.leaked = 1;", context()).await;
        let result = engine.run("typeof leaked", context()).await;
        assert_eq!(result.return_value(), Some(&serde_json::json!("undefined")));
    }

    #[tokio::test]
    async fn test_reads_response_in_post_script() {
        let mut ctx = context();
        ctx.set_response(
            ApiResponse::new(201, Duration::from_millis(12)).with_body(r#"{"id":"u1"}"#),
        );
        let code = r#"
            const body = JSON.parse(pm.response.body);
            pm.variables.user_id = body.id;
            pm.response.status = 500;
        "#;

        let result = engine().run(code, ctx).await;

        let ctx = result.context();
        assert_eq!(ctx.variables().get("user_id").map(String::as_str), Some("u1"));
        assert_eq!(ctx.status_code(), Some(201));
    }

    #[tokio::test]
    async fn test_timeout_interrupts_runaway_scripts() {
        let engine = JavaScriptEngine::new(&ScriptSettings {
            timeout_ms: 50,
            ..ScriptSettings::default()
        })
        .expect("runtime");

        let result = engine.run("while (true) {}", context()).await;

        assert_eq!(result.error(), Some("script exceeded 50ms"));
        let after = engine.run("1 + 1", context()).await;
        assert_eq!(after.return_value(), Some(&serde_json::json!(2)));
    }
}
