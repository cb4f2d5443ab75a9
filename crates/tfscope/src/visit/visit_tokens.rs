use super::Visit;
use crate::token::{Token, TokenId};
use crate::tree::TokenTree;

/// Depth-first, pre-order walk over a token and everything below it
///
/// Children are visited in source order.
pub trait VisitTokens {
    fn visit_tokens(&self, from: TokenId, visitor: &mut dyn Visit<Token>);
}

impl VisitTokens for TokenTree {
    fn visit_tokens(&self, from: TokenId, visitor: &mut dyn Visit<Token>) {
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            let token = self.get(id);
            visitor.visit(token);
            stack.extend(token.children.iter().rev().copied());
        }
    }
}
