//! function values and the built-in terragrunt helpers
//!
//! A [Function] wraps a [Callable] capability object. Calling it takes the ordered arguments plus a
//! [FunctionContext] and yields `None` when there is no applicable result. That is not an error, callers keep the
//! unevaluated expression instead.
use crate::host::FileSystem;
use crate::value::RuntimeValue;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

pub trait Callable: Send + Sync {
    fn call(
        &self,
        arguments: &[RuntimeValue],
        context: &FunctionContext<'_>,
    ) -> Option<RuntimeValue>;
}

impl<F> Callable for F
where
    F: Fn(&[RuntimeValue], &FunctionContext<'_>) -> Option<RuntimeValue> + Send + Sync,
{
    fn call(
        &self,
        arguments: &[RuntimeValue],
        context: &FunctionContext<'_>,
    ) -> Option<RuntimeValue> {
        self(arguments, context)
    }
}

/// A named callable
///
/// Two functions compare equal when they carry the same name.
#[derive(Clone)]
pub struct Function {
    name: String,
    callable: Arc<dyn Callable>,
}

impl Function {
    pub fn new(name: impl Into<String>, callable: impl Callable + 'static) -> Self {
        Self {
            name: name.into(),
            callable: Arc::new(callable),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(
        &self,
        arguments: &[RuntimeValue],
        context: &FunctionContext<'_>,
    ) -> Option<RuntimeValue> {
        let result = self.callable.call(arguments, context);
        tracing::trace!(
            function = %self.name,
            arguments = arguments.len(),
            applicable = result.is_some(),
            "call"
        );
        result
    }
}

impl std::fmt::Debug for Function {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Function").field("name", &self.name).finish_non_exhaustive()
    }
}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

/// External command a document is evaluated for (`terraform plan -out=x`)
#[derive(Debug, Clone, PartialEq, Eq, derive_new::new)]
pub struct Command {
    pub name: String,
    pub arguments: Vec<String>,
}

/// Everything a function may look at
pub struct FunctionContext<'a> {
    pub working_dir: PathBuf,
    pub env: HashMap<String, String>,
    pub document: &'a Path,
    pub text: &'a str,
    pub command: Option<Command>,
    pub fs: Option<&'a dyn FileSystem>,
    /// document that included the current one
    pub included_from: Option<&'a Path>,
}

impl<'a> FunctionContext<'a> {
    /// Context with the document's directory as working directory and an empty environment
    pub fn new(document: &'a Path, text: &'a str) -> Self {
        Self {
            working_dir: parent_dir(document).to_path_buf(),
            env: HashMap::new(),
            document,
            text,
            command: None,
            fs: None,
            included_from: None,
        }
    }

    pub fn with_process_env(mut self) -> Self {
        self.env = std::env::vars().collect();
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_fs(mut self, fs: &'a dyn FileSystem) -> Self {
        self.fs = Some(fs);
        self
    }

    pub fn with_command(mut self, command: Command) -> Self {
        self.command = Some(command);
        self
    }

    pub fn with_included_from(mut self, parent: &'a Path) -> Self {
        self.included_from = Some(parent);
        self
    }

    fn document_dir(&self) -> &Path {
        parent_dir(self.document)
    }
}

fn parent_dir(path: &Path) -> &Path {
    path.parent().unwrap_or(Path::new(""))
}

fn path_value(path: &Path) -> RuntimeValue {
    RuntimeValue::String(path.to_string_lossy().into_owned())
}

type Builtin = fn(&[RuntimeValue], &FunctionContext<'_>) -> Option<RuntimeValue>;

/// All built-in functions by name
pub fn builtin_functions() -> IndexMap<&'static str, Function> {
    let builtins: [(&'static str, Builtin); 7] = [
        ("get_env", get_env),
        ("get_terragrunt_dir", get_terragrunt_dir),
        ("get_parent_terragrunt_dir", get_parent_terragrunt_dir),
        ("path_relative_to_include", path_relative_to_include),
        ("find_in_parent_folders", find_in_parent_folders),
        ("get_terraform_command", get_terraform_command),
        ("get_terraform_cli_args", get_terraform_cli_args),
    ];

    builtins
        .into_iter()
        .map(|(name, callable)| (name, Function::new(name, callable)))
        .collect()
}

/// `get_env(name, default?)`
fn get_env(arguments: &[RuntimeValue], context: &FunctionContext<'_>) -> Option<RuntimeValue> {
    let name = arguments.first()?.as_str()?;
    context
        .env
        .get(name)
        .map(|value| RuntimeValue::String(value.clone()))
        .or_else(|| arguments.get(1).cloned())
}

fn get_terragrunt_dir(_: &[RuntimeValue], context: &FunctionContext<'_>) -> Option<RuntimeValue> {
    Some(path_value(context.document_dir()))
}

/// Directory of the including document, or our own when not included
fn get_parent_terragrunt_dir(
    _: &[RuntimeValue],
    context: &FunctionContext<'_>,
) -> Option<RuntimeValue> {
    let dir = match context.included_from {
        Some(parent) => parent_dir(parent),
        None => context.document_dir(),
    };
    Some(path_value(dir))
}

/// Relative path from the including document's directory to ours, `.` when not included
fn path_relative_to_include(
    _: &[RuntimeValue],
    context: &FunctionContext<'_>,
) -> Option<RuntimeValue> {
    let Some(parent) = context.included_from else {
        return Some(".".into());
    };
    Some(path_value(&relative_path(parent_dir(parent), context.document_dir())))
}

/// `find_in_parent_folders(name = "terragrunt.hcl", fallback?)`
///
/// Searches upwards starting at the parent of the document's directory.
fn find_in_parent_folders(
    arguments: &[RuntimeValue],
    context: &FunctionContext<'_>,
) -> Option<RuntimeValue> {
    let name = arguments
        .first()
        .and_then(RuntimeValue::as_str)
        .unwrap_or("terragrunt.hcl");
    let fallback = arguments.get(1).cloned();

    let Some(fs) = context.fs else {
        tracing::debug!("find_in_parent_folders without filesystem");
        return fallback;
    };

    context
        .document_dir()
        .ancestors()
        .skip(1)
        .map(|dir| dir.join(name))
        .find(|candidate| fs.exists(candidate))
        .map(|found| path_value(&found))
        .or(fallback)
}

fn get_terraform_command(
    _: &[RuntimeValue],
    context: &FunctionContext<'_>,
) -> Option<RuntimeValue> {
    context
        .command
        .as_ref()
        .map(|command| RuntimeValue::String(command.name.clone()))
}

fn get_terraform_cli_args(
    _: &[RuntimeValue],
    context: &FunctionContext<'_>,
) -> Option<RuntimeValue> {
    context
        .command
        .as_ref()
        .map(|command| command.arguments.clone().into())
}

/// Purely lexical relative path, both sides are expected to be normalized the same way
fn relative_path(from: &Path, to: &Path) -> PathBuf {
    let from: Vec<Component> = from.components().collect();
    let to: Vec<Component> = to.components().collect();
    let common = from.iter().zip(&to).take_while(|(a, b)| a == b).count();

    let mut relative = PathBuf::new();
    for _ in common..from.len() {
        relative.push("..");
    }
    for component in &to[common..] {
        relative.push(component);
    }

    if relative.as_os_str().is_empty() {
        relative.push(".");
    }
    relative
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::host::memory::MemoryFileSystem;
    use pretty_assertions::assert_eq;

    fn call(
        name: &str,
        arguments: &[RuntimeValue],
        context: &FunctionContext<'_>,
    ) -> Option<RuntimeValue> {
        builtin_functions()[name].call(arguments, context)
    }

    fn double(arguments: &[RuntimeValue], _: &FunctionContext<'_>) -> Option<RuntimeValue> {
        match arguments.first()? {
            RuntimeValue::Number(n) => Some(RuntimeValue::Number(n * 2.0)),
            _ => None,
        }
    }

    #[test]
    fn custom_functions() {
        let double = Function::new("double", double);
        let context = FunctionContext::new(Path::new("/live/app/terragrunt.hcl"), "");

        assert_eq!(double.call(&[2.0.into()], &context), Some(4.0.into()));
        assert_eq!(double.call(&["x".into()], &context), None);
        assert_eq!(RuntimeValue::from(double).to_string(), "double()");
    }

    #[test]
    fn env() {
        let context = FunctionContext::new(Path::new("/live/terragrunt.hcl"), "")
            .with_env("REGION", "eu-west-1");
        assert_eq!(call("get_env", &["REGION".into()], &context), Some("eu-west-1".into()));
        assert_eq!(
            call("get_env", &["MISSING".into(), "fallback".into()], &context),
            Some("fallback".into())
        );
        assert_eq!(call("get_env", &["MISSING".into()], &context), None);
        assert_eq!(call("get_env", &[], &context), None);
    }

    #[test]
    fn directories() {
        let parent = Path::new("/live/terragrunt.hcl");
        let context = FunctionContext::new(Path::new("/live/prod/vpc/terragrunt.hcl"), "");
        assert_eq!(call("get_terragrunt_dir", &[], &context), Some("/live/prod/vpc".into()));
        assert_eq!(call("get_parent_terragrunt_dir", &[], &context), Some("/live/prod/vpc".into()));
        assert_eq!(call("path_relative_to_include", &[], &context), Some(".".into()));

        let context = context.with_included_from(parent);
        assert_eq!(call("get_parent_terragrunt_dir", &[], &context), Some("/live".into()));
        assert_eq!(call("path_relative_to_include", &[], &context), Some("prod/vpc".into()));
    }

    #[test]
    fn find_in_parent_folders_walks_up() {
        let fs = MemoryFileSystem::default();
        fs.insert("/live/terragrunt.hcl", "");
        fs.insert("/live/prod/vpc/terragrunt.hcl", "");
        fs.insert("/live/prod/account.hcl", "");

        let context =
            FunctionContext::new(Path::new("/live/prod/vpc/terragrunt.hcl"), "").with_fs(&fs);
        assert_eq!(
            call("find_in_parent_folders", &[], &context),
            Some("/live/terragrunt.hcl".into())
        );
        assert_eq!(
            call("find_in_parent_folders", &["account.hcl".into()], &context),
            Some("/live/prod/account.hcl".into())
        );
        assert_eq!(call("find_in_parent_folders", &["nope.hcl".into()], &context), None);
        assert_eq!(
            call("find_in_parent_folders", &["nope.hcl".into(), "default".into()], &context),
            Some("default".into())
        );
    }

    #[test]
    fn find_in_parent_folders_without_filesystem() {
        let context = FunctionContext::new(Path::new("/live/prod/terragrunt.hcl"), "");
        assert_eq!(call("find_in_parent_folders", &[], &context), None);
    }

    #[test]
    fn terraform_command() {
        let context = FunctionContext::new(Path::new("/live/terragrunt.hcl"), "");
        assert_eq!(call("get_terraform_command", &[], &context), None);
        assert_eq!(call("get_terraform_cli_args", &[], &context), None);

        let context =
            context.with_command(Command::new("plan".into(), vec!["-out=plan.bin".into()]));
        assert_eq!(call("get_terraform_command", &[], &context), Some("plan".into()));
        assert_eq!(
            call("get_terraform_cli_args", &[], &context),
            Some(RuntimeValue::Array(vec!["-out=plan.bin".into()]))
        );
    }

    #[test]
    fn relative_paths() {
        assert_eq!(relative_path(Path::new("/a/b"), Path::new("/a/b")), PathBuf::from("."));
        assert_eq!(relative_path(Path::new("/a/b"), Path::new("/a/c/d")), PathBuf::from("../c/d"));
    }
}
