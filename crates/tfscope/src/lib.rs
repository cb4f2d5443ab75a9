//! # tfscope - terraform/terragrunt configuration scope
//!
//! Tokens, trees and resolved state outputs for editor tooling (hover, completion, diagnostics).
//!
//! ## Introduction for developers
//!
//! Read this to understand how `tfscope` works internally.
//!
//! The pipeline is: text → tokens → tree, and independently: document location → state → values.
//! A consumer (hover provider, completion engine) joins references found in the tree with resolved values.
//!
//! ### Lexing
//!
//! see [lexer::tokenize]
//!
//! The lexer never fails. The root's direct children cover the input in order and without gaps, so concatenating
//! their texts gives back the input. Strings and heredocs keep their full text (quotes included) and carry their
//! interpolations as children. Anything the lexer cannot make sense of becomes a [token::TokenKind::Unknown] token
//! and lexing continues right after it.
//!
//! ```hcl
//! dependency "vpc" {
//!   config_path = "../vpc"
//! }
//!
//! inputs = {
//!   vpc_id = "${dependency.vpc.outputs.vpc_id}"
//! }
//! ```
//!
//! Lexed (trivia omitted):
//!
//! | text                               | kind                    |
//! |------------------------------------|-------------------------|
//! | `dependency`                       | block                   |
//! | `"vpc"`                            | string-literal          |
//! | `config_path`                      | attribute               |
//! | `"../vpc"`                         | string-literal, decorated as file-path |
//! | `inputs`                           | block (block assignment)|
//! | `"${dependency.vpc.outputs.vpc_id}"` | string-literal with an interpolation child |
//!
//! Literal and identifier tokens are run through [decorator::classify], which marks sub-spans like module sources,
//! URLs, paths, emails and addresses.
//!
//! ### Nesting
//!
//! see [tree::build_tree]
//!
//! Tokens live in a flat arena ([tree::TokenTree]), parents and children are [token::TokenId]s into it. The builder
//! groups the flat stream into blocks, attributes, object/array literals and function calls. It uses an explicit
//! delimiter stack; a closer that does not match is wrapped into an `unknown` token instead of failing.
//!
//! [tree::position_context] answers "what is the cursor in" for completion.
//!
//! ### Values
//!
//! [value::RuntimeValue] is a closed enum over every value tag. [value::coerce] turns untyped JSON plus a declared
//! type name into a value. It never fails.
//!
//! ### State
//!
//! [state::StateResolver] finds the `terraform.tfstate` beside a document, caches it under the document's location and
//! serves its outputs through [value::coerce]. File access goes through the [host::FileSystem] capability; without
//! one every lookup is simply absent.
//!
pub mod decorator;
pub mod functions;
pub mod host;
pub mod lexer;
pub mod state;
pub mod token;
pub mod tree;
pub mod value;
pub mod visit;
