//! Mailbox commands
//!
//! Each mutating request carries its own oneshot reply channel; the actor
//! answers with exactly the result the engine produced.

use amm::{Amount, PoolError, SwapDirection, TxContext};
use tokio::sync::oneshot;

/// Reply channel for a single command
pub type Reply<T> = oneshot::Sender<Result<T, PoolError>>;

/// Request processed by the pool actor, in arrival order
#[derive(Debug)]
pub enum PoolCommand {
    AddLiquidity {
        ctx: TxContext,
        amount1: Amount,
        amount2: Amount,
        reply: Reply<Amount>,
    },
    RemoveLiquidity {
        ctx: TxContext,
        shares: Amount,
        reply: Reply<(Amount, Amount)>,
    },
    Swap {
        ctx: TxContext,
        direction: SwapDirection,
        amount_in: Amount,
        reply: Reply<Amount>,
    },
    /// Stop after every command queued ahead of this one
    Shutdown { reply: oneshot::Sender<()> },
}

/// Command discriminant, used for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    AddLiquidity,
    RemoveLiquidity,
    Swap,
    Shutdown,
}

impl PoolCommand {
    pub fn kind(&self) -> CommandKind {
        match self {
            PoolCommand::AddLiquidity { .. } => CommandKind::AddLiquidity,
            PoolCommand::RemoveLiquidity { .. } => CommandKind::RemoveLiquidity,
            PoolCommand::Swap { .. } => CommandKind::Swap,
            PoolCommand::Shutdown { .. } => CommandKind::Shutdown,
        }
    }

    /// Account whose share balance the command may change
    pub fn caller(&self) -> Option<amm::AccountId> {
        match self {
            PoolCommand::AddLiquidity { ctx, .. }
            | PoolCommand::RemoveLiquidity { ctx, .. }
            | PoolCommand::Swap { ctx, .. } => Some(ctx.caller),
            PoolCommand::Shutdown { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use amm::AccountId;

    #[test]
    fn test_kind_and_caller() {
        let (reply, _rx) = oneshot::channel();
        let cmd = PoolCommand::Swap {
            ctx: TxContext::new(AccountId::from_low_byte(3), 10),
            direction: SwapDirection::Token2In,
            amount_in: 5,
            reply,
        };
        assert_eq!(cmd.kind(), CommandKind::Swap);
        assert_eq!(cmd.caller(), Some(AccountId::from_low_byte(3)));

        let (reply, _rx) = oneshot::channel();
        let stop = PoolCommand::Shutdown { reply };
        assert_eq!(stop.kind(), CommandKind::Shutdown);
        assert_eq!(stop.caller(), None);
    }
}
