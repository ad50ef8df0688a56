use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::evaluator::{EvalError, Evaluator};
use crate::model::{BaseScenario, Scenario};

type Money = Decimal;
type Rate = Decimal;

const NOI_INPUTS: [&str; 4] = [
    "gross_potential_rent",
    "vacancy_rate",
    "other_income",
    "operating_expenses",
];

const DEBT_INPUTS: [&str; 3] = ["loan_amount", "loan_rate", "amortization_years"];

// ---------------------------------------------------------------------------
// Models
// ---------------------------------------------------------------------------

/// Property-level metrics computed from named assumptions.
///
/// Rates are fractions (0.05 = 5%), amounts are annual unless the name says
/// otherwise. Arithmetic runs in `Decimal`; only the final metric is
/// converted back to `f64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RealEstateModel {
    /// monthly_rent * (1 - vacancy_rate) * 12
    AnnualEffectiveRent,
    /// GPR * (1 - vacancy) + other income - operating expenses
    NetOperatingIncome,
    /// NOI / cap_rate
    DirectCapValue,
    /// NOI - annual debt service
    AnnualCashFlow,
    /// (NOI - debt service) / equity_investment
    CashOnCash,
    /// NOI / annual debt service
    Dscr,
}

impl RealEstateModel {
    pub const ALL: [RealEstateModel; 6] = [
        RealEstateModel::AnnualEffectiveRent,
        RealEstateModel::NetOperatingIncome,
        RealEstateModel::DirectCapValue,
        RealEstateModel::AnnualCashFlow,
        RealEstateModel::CashOnCash,
        RealEstateModel::Dscr,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            RealEstateModel::AnnualEffectiveRent => "annual_effective_rent",
            RealEstateModel::NetOperatingIncome => "net_operating_income",
            RealEstateModel::DirectCapValue => "direct_cap_value",
            RealEstateModel::AnnualCashFlow => "annual_cash_flow",
            RealEstateModel::CashOnCash => "cash_on_cash",
            RealEstateModel::Dscr => "dscr",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            RealEstateModel::AnnualEffectiveRent => "Annual rent collected after vacancy",
            RealEstateModel::NetOperatingIncome => "Effective gross income less operating expenses",
            RealEstateModel::DirectCapValue => "Property value by direct capitalisation of NOI",
            RealEstateModel::AnnualCashFlow => "NOI after level-payment debt service",
            RealEstateModel::CashOnCash => "Year-one levered cash flow over equity invested",
            RealEstateModel::Dscr => "Debt service coverage ratio",
        }
    }

    /// Assumptions the model reads; all must be in the base scenario.
    pub fn required_assumptions(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = match self {
            RealEstateModel::AnnualEffectiveRent => return vec!["monthly_rent", "vacancy_rate"],
            _ => NOI_INPUTS.to_vec(),
        };
        match self {
            RealEstateModel::DirectCapValue => names.push("cap_rate"),
            RealEstateModel::AnnualCashFlow | RealEstateModel::Dscr => names.extend(DEBT_INPUTS),
            RealEstateModel::CashOnCash => {
                names.extend(DEBT_INPUTS);
                names.push("equity_investment");
            }
            _ => {}
        }
        names
    }

    pub fn missing_assumptions(&self, base: &BaseScenario) -> Vec<&'static str> {
        self.required_assumptions()
            .into_iter()
            .filter(|name| !base.contains(name))
            .collect()
    }

    fn compute(&self, s: &Scenario) -> Result<Decimal, EvalError> {
        match self {
            RealEstateModel::AnnualEffectiveRent => {
                let rent = input(s, "monthly_rent")?;
                let vacancy = input(s, "vacancy_rate")?;
                Ok(rent * (Decimal::ONE - vacancy) * dec!(12))
            }
            RealEstateModel::NetOperatingIncome => noi(s),
            RealEstateModel::DirectCapValue => {
                let cap_rate = input(s, "cap_rate")?;
                if cap_rate.is_zero() {
                    return Err(EvalError::DivisionByZero("direct capitalisation (NOI / cap_rate)".into()));
                }
                Ok(noi(s)? / cap_rate)
            }
            RealEstateModel::AnnualCashFlow => Ok(noi(s)? - annual_debt_service(s)?),
            RealEstateModel::CashOnCash => {
                let equity = input(s, "equity_investment")?;
                if equity.is_zero() {
                    return Err(EvalError::DivisionByZero("cash-on-cash (cash flow / equity)".into()));
                }
                Ok((noi(s)? - annual_debt_service(s)?) / equity)
            }
            RealEstateModel::Dscr => {
                let debt_service = annual_debt_service(s)?;
                if debt_service.is_zero() {
                    return Err(EvalError::DivisionByZero("DSCR (NOI / debt service)".into()));
                }
                Ok(noi(s)? / debt_service)
            }
        }
    }
}

impl Evaluator for RealEstateModel {
    fn evaluate(&self, scenario: &Scenario) -> Result<f64, EvalError> {
        let value = self.compute(scenario)?;
        value
            .to_f64()
            .ok_or_else(|| EvalError::Overflow(format!("{} as f64", self.name())))
    }

    fn metric_name(&self) -> &str {
        self.name()
    }
}

// ---------------------------------------------------------------------------
// Building blocks
// ---------------------------------------------------------------------------

fn input(s: &Scenario, name: &str) -> Result<Decimal, EvalError> {
    let v = s.value(name)?;
    Decimal::try_from(v).map_err(|_| EvalError::Overflow(format!("{name} = {v} as decimal")))
}

fn noi(s: &Scenario) -> Result<Money, EvalError> {
    let gpr = input(s, "gross_potential_rent")?;
    let vacancy = input(s, "vacancy_rate")?;
    let other = input(s, "other_income")?;
    let opex = input(s, "operating_expenses")?;
    Ok(gpr * (Decimal::ONE - vacancy) + other - opex)
}

fn annual_debt_service(s: &Scenario) -> Result<Money, EvalError> {
    let loan = input(s, "loan_amount")?;
    let rate = input(s, "loan_rate")?;
    let years = s.value("amortization_years")?;
    let months = (years * 12.0).round();
    if !(1.0..=1200.0).contains(&months) {
        return Err(EvalError::Failed(format!(
            "amortization_years must give 1 to 1200 monthly payments (got {years})"
        )));
    }
    Ok(monthly_payment(loan, rate / dec!(12), months as u32)? * dec!(12))
}

/// Level payment P * r(1+r)^n / ((1+r)^n - 1); straight-line when r = 0.
fn monthly_payment(principal: Money, monthly_rate: Rate, total_months: u32) -> Result<Money, EvalError> {
    if monthly_rate.is_zero() {
        return Ok(principal / Decimal::from(total_months));
    }

    let mut compound = Decimal::ONE;
    for _ in 0..total_months {
        compound = compound
            .checked_mul(Decimal::ONE + monthly_rate)
            .ok_or_else(|| EvalError::Overflow("mortgage compounding".into()))?;
    }

    let denominator = compound - Decimal::ONE;
    if denominator.is_zero() {
        return Err(EvalError::DivisionByZero("mortgage payment denominator".into()));
    }
    principal
        .checked_mul(monthly_rate)
        .and_then(|x| x.checked_mul(compound))
        .map(|numerator| numerator / denominator)
        .ok_or_else(|| EvalError::Overflow("mortgage payment".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::evaluate_checked;

    fn property() -> BaseScenario {
        BaseScenario::from_pairs([
            ("gross_potential_rent", 1_200_000.0),
            ("vacancy_rate", 0.05),
            ("other_income", 50_000.0),
            ("operating_expenses", 400_000.0),
            ("cap_rate", 0.06),
            ("loan_amount", 7_500_000.0),
            ("loan_rate", 0.065),
            ("amortization_years", 30.0),
            ("equity_investment", 2_500_000.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_annual_effective_rent() {
        let base = BaseScenario::from_pairs([("monthly_rent", 2000.0), ("vacancy_rate", 0.05)]).unwrap();
        let v = RealEstateModel::AnnualEffectiveRent.evaluate(&base.scenario()).unwrap();
        assert!((v - 22800.0).abs() < 1e-9);
    }

    #[test]
    fn test_noi_and_direct_cap() {
        let s = property().scenario();
        // 1.2m * 0.95 + 50k - 400k
        let noi = RealEstateModel::NetOperatingIncome.evaluate(&s).unwrap();
        assert!((noi - 790_000.0).abs() < 1e-6);
        let value = RealEstateModel::DirectCapValue.evaluate(&s).unwrap();
        assert!((value - 790_000.0 / 0.06).abs() < 1e-3);
    }

    #[test]
    fn test_monthly_payment_sanity() {
        // $750k at 6.5% over 30 years is about $4,740/mo
        let payment = monthly_payment(dec!(750000), dec!(0.065) / dec!(12), 360).unwrap();
        assert!(payment > dec!(4700) && payment < dec!(4800), "payment {payment}");
    }

    #[test]
    fn test_zero_rate_loan() {
        assert_eq!(monthly_payment(dec!(360000), Decimal::ZERO, 360).unwrap(), dec!(1000));
    }

    #[test]
    fn test_levered_metrics_consistent() {
        let s = property().scenario();
        let noi = RealEstateModel::NetOperatingIncome.evaluate(&s).unwrap();
        let cf = RealEstateModel::AnnualCashFlow.evaluate(&s).unwrap();
        let dscr = RealEstateModel::Dscr.evaluate(&s).unwrap();
        let coc = RealEstateModel::CashOnCash.evaluate(&s).unwrap();
        let debt_service = noi - cf;
        // ~$47.4k/mo on $7.5m
        assert!(debt_service > 560_000.0 && debt_service < 580_000.0);
        assert!((dscr - noi / debt_service).abs() < 1e-9);
        assert!((coc - cf / 2_500_000.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_cap_rate_is_eval_error() {
        let s = property().with_override("cap_rate", 0.0).unwrap();
        assert!(matches!(
            evaluate_checked(&RealEstateModel::DirectCapValue, &s),
            Err(EvalError::DivisionByZero(_))
        ));
    }

    #[test]
    fn test_required_assumptions() {
        assert_eq!(
            RealEstateModel::AnnualEffectiveRent.required_assumptions(),
            vec!["monthly_rent", "vacancy_rate"]
        );
        assert!(RealEstateModel::CashOnCash
            .required_assumptions()
            .contains(&"equity_investment"));
        for model in RealEstateModel::ALL {
            if model != RealEstateModel::AnnualEffectiveRent {
                assert!(model.missing_assumptions(&property()).is_empty(), "{model:?}");
            }
        }
        let rent_only = BaseScenario::from_pairs([("monthly_rent", 2000.0)]).unwrap();
        assert_eq!(
            RealEstateModel::AnnualEffectiveRent.missing_assumptions(&rent_only),
            vec!["vacancy_rate"]
        );
    }

    #[test]
    fn test_serde_names_match() {
        for model in RealEstateModel::ALL {
            let json = serde_json::to_string(&model).unwrap();
            assert_eq!(json, format!("\"{}\"", model.name()));
        }
    }
}
