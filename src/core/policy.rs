use rust_decimal::Decimal;
use rust_decimal_macros::dec;

pub const DEFAULT_AUTO_APPROVAL_LIMIT: Decimal = dec!(100);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyDecision {
    AutoApprove,
    RequiresApproval { reason: String },
}

/// 自動核准門檻：金額 <= 門檻直接撥款，超過則需人工審核
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalPolicy {
    auto_approval_limit: Decimal,
}

impl ApprovalPolicy {
    pub fn new(auto_approval_limit: Decimal) -> Self {
        Self {
            auto_approval_limit,
        }
    }

    pub fn auto_approval_limit(&self) -> Decimal {
        self.auto_approval_limit
    }

    pub fn evaluate(&self, amount: Decimal) -> PolicyDecision {
        if amount <= self.auto_approval_limit {
            PolicyDecision::AutoApprove
        } else {
            PolicyDecision::RequiresApproval {
                reason: format!(
                    "Amount ${} exceeds auto-approval limit of {}. Requires manual approval.",
                    amount,
                    self.auto_approval_limit.normalize()
                ),
            }
        }
    }
}

impl Default for ApprovalPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_AUTO_APPROVAL_LIMIT)
    }
}
