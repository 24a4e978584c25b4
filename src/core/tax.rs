use super::aggregate::{YearlyPnl, YearlySummary};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use schemars::JsonSchema;
use serde::Serialize;

/// Flat capital gains ("Belka") tax rate
pub const BELKA_RATE: Decimal = dec!(0.19);

/// Income subject to tax for a year, after loss carryforward
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TaxableBase {
    pub year: i32,
    pub base: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TaxDue {
    pub year: i32,
    pub amount: Decimal,
}

/// Offset yearly profits against losses carried forward from earlier years.
///
/// Input must be in ascending year order. Losses are carried forward
/// indefinitely: the statutory five year limit on loss relief is not
/// applied.
pub fn compute_taxable_base(yearly: &[YearlyPnl]) -> Vec<TaxableBase> {
    // always <= 0
    let mut carryover_loss = Decimal::ZERO;

    yearly
        .iter()
        .map(|&YearlyPnl { year, pnl }| {
            let base = if pnl < Decimal::ZERO {
                carryover_loss += pnl;
                Decimal::ZERO
            } else if carryover_loss < Decimal::ZERO {
                if pnl > carryover_loss.abs() {
                    let base = pnl + carryover_loss;
                    carryover_loss = Decimal::ZERO;
                    base
                } else {
                    carryover_loss += pnl;
                    Decimal::ZERO
                }
            } else {
                pnl
            };
            log::debug!("{}: pnl {}, base {}, carryover {}", year, pnl, base, carryover_loss);
            TaxableBase { year, base }
        })
        .collect()
}

/// Apply the flat rate to each year's base. No rounding is applied.
pub fn compute_tax(bases: &[TaxableBase]) -> Vec<TaxDue> {
    bases
        .iter()
        .map(|&TaxableBase { year, base }| {
            let amount = if base > Decimal::ZERO {
                base * BELKA_RATE
            } else {
                Decimal::ZERO
            };
            TaxDue { year, amount }
        })
        .collect()
}

/// One year of the assembled report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct ReportYear {
    pub year: i32,
    #[schemars(with = "String")]
    pub pnl: Decimal,
    /// Sum of converted cost basis (detailed mode only)
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub cost_basis: Option<Decimal>,
    /// Sum of converted sale proceeds (detailed mode only)
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub amount: Option<Decimal>,
    #[schemars(with = "String")]
    pub taxable_base: Decimal,
    #[schemars(with = "String")]
    pub tax: Decimal,
}

/// Yearly PnL, taxable base and tax side by side, at full precision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct TaxReport {
    /// Currency the amounts were converted from
    pub currency: String,
    pub years: Vec<ReportYear>,
}

impl TaxReport {
    pub fn build(currency: &str, yearly: &[YearlyPnl]) -> Self {
        let bases = compute_taxable_base(yearly);
        let taxes = compute_tax(&bases);

        let years = yearly
            .iter()
            .zip(bases)
            .zip(taxes)
            .map(|((pnl, base), tax)| ReportYear {
                year: pnl.year,
                pnl: pnl.pnl,
                cost_basis: None,
                amount: None,
                taxable_base: base.base,
                tax: tax.amount,
            })
            .collect();

        TaxReport {
            currency: currency.to_uppercase(),
            years,
        }
    }

    pub fn build_detailed(currency: &str, summaries: &[YearlySummary]) -> Self {
        let yearly: Vec<YearlyPnl> = summaries.iter().map(YearlySummary::to_pnl).collect();
        let mut report = Self::build(currency, &yearly);
        for (year, summary) in report.years.iter_mut().zip(summaries) {
            year.cost_basis = Some(summary.total_cost_basis);
            year.amount = Some(summary.total_amount);
        }
        report
    }

    pub fn year(&self, year: i32) -> Option<&ReportYear> {
        self.years.iter().find(|y| y.year == year)
    }

    pub fn total_tax(&self) -> Decimal {
        self.years.iter().map(|y| y.tax).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pnl(entries: &[(i32, Decimal)]) -> Vec<YearlyPnl> {
        entries
            .iter()
            .map(|&(year, pnl)| YearlyPnl { year, pnl })
            .collect()
    }

    fn bases(entries: &[(i32, Decimal)]) -> Vec<TaxableBase> {
        entries
            .iter()
            .map(|&(year, base)| TaxableBase { year, base })
            .collect()
    }

    #[test]
    fn loss_is_carried_forward() {
        let yearly = pnl(&[(2023, dec!(-100)), (2024, dec!(50)), (2025, dec!(200))]);
        assert_eq!(
            compute_taxable_base(&yearly),
            bases(&[(2023, dec!(0)), (2024, dec!(0)), (2025, dec!(150))])
        );
    }

    #[test]
    fn all_profitable_years_pass_through() {
        let yearly = pnl(&[(2023, dec!(300)), (2024, dec!(700))]);
        assert_eq!(
            compute_taxable_base(&yearly),
            bases(&[(2023, dec!(300)), (2024, dec!(700))])
        );
    }

    #[test]
    fn profit_equal_to_loss_fully_absorbed() {
        let yearly = pnl(&[(2021, dec!(-80)), (2022, dec!(80)), (2023, dec!(10))]);
        assert_eq!(
            compute_taxable_base(&yearly),
            bases(&[(2021, dec!(0)), (2022, dec!(0)), (2023, dec!(10))])
        );
    }

    #[test]
    fn consecutive_losses_accumulate() {
        let yearly = pnl(&[
            (2019, dec!(-30)),
            (2020, dec!(-20)),
            (2021, dec!(0)),
            (2022, dec!(70)),
        ]);
        assert_eq!(
            compute_taxable_base(&yearly),
            bases(&[(2019, dec!(0)), (2020, dec!(0)), (2021, dec!(0)), (2022, dec!(20))])
        );
    }

    #[test]
    fn losses_never_expire() {
        let yearly = pnl(&[
            (2010, dec!(-500)),
            (2016, dec!(100)),
            (2023, dec!(1000)),
        ]);
        assert_eq!(
            compute_taxable_base(&yearly),
            bases(&[(2010, dec!(0)), (2016, dec!(0)), (2023, dec!(600))])
        );
    }

    #[test]
    fn tax_is_flat_nineteen_percent() {
        let taxes = compute_tax(&bases(&[(2023, dec!(0)), (2024, dec!(1000))]));
        assert_eq!(
            taxes,
            vec![
                TaxDue { year: 2023, amount: dec!(0) },
                TaxDue { year: 2024, amount: dec!(190.00) },
            ]
        );
    }

    #[test]
    fn tax_keeps_full_precision() {
        let taxes = compute_tax(&bases(&[(2023, dec!(10.01))]));
        assert_eq!(taxes[0].amount, dec!(1.9019));
    }

    #[test]
    fn usd_profit_to_pln_tax() {
        use crate::core::{aggregate, convert, RateTable, Transaction};
        use chrono::NaiveDate;

        let day = NaiveDate::from_ymd_opt(2023, 3, 15).unwrap();
        let rates: RateTable = std::iter::once((day, dec!(4.00))).collect();

        let converted = convert(&[Transaction::new(day, dec!(100))], &rates).unwrap();
        assert_eq!(converted, vec![Transaction::new(day, dec!(400.00))]);

        let yearly = aggregate(&converted);
        assert_eq!(yearly, pnl(&[(2023, dec!(400.00))]));

        let taxable = compute_taxable_base(&yearly);
        assert_eq!(taxable, bases(&[(2023, dec!(400.00))]));

        let taxes = compute_tax(&taxable);
        assert_eq!(taxes, vec![TaxDue { year: 2023, amount: dec!(76.00) }]);
    }

    #[test]
    fn report_combines_stages() {
        let yearly = pnl(&[(2023, dec!(-100)), (2024, dec!(50)), (2025, dec!(200))]);
        let report = TaxReport::build("usd", &yearly);

        assert_eq!(report.currency, "USD");
        assert_eq!(report.years.len(), 3);
        let last = report.year(2025).unwrap();
        assert_eq!(last.pnl, dec!(200));
        assert_eq!(last.taxable_base, dec!(150));
        assert_eq!(last.tax, dec!(28.50));
        assert_eq!(last.cost_basis, None);
        assert_eq!(report.total_tax(), dec!(28.50));
    }

    #[test]
    fn detailed_report_carries_totals() {
        let summaries = vec![YearlySummary {
            year: 2023,
            total_pnl: dec!(400),
            total_cost_basis: dec!(1000),
            total_amount: dec!(1400),
        }];
        let report = TaxReport::build_detailed("usd", &summaries);

        let year = report.year(2023).unwrap();
        assert_eq!(year.cost_basis, Some(dec!(1000)));
        assert_eq!(year.amount, Some(dec!(1400)));
        assert_eq!(year.tax, dec!(76));
    }
}
