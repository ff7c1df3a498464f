use bigdecimal::BigDecimal;
use clap::{Args, Parser, Subcommand, ValueEnum};
use housing_ledger::report::{self, Debtor};
use housing_ledger::storage::{load_book, save_book};
use housing_ledger::{
    Book, BookOptions, OverpaymentPolicy, OwnerId, PaymentReceipt, Period, Result, Role,
    ServiceCategory, Session, SettledLedgerPolicy,
};
use std::path::PathBuf;
use std::process::ExitCode;

/// Keeps water and electricity debts of housing owners.
/// Accruals raise an owner's debt, payments settle it water first, then electricity,
/// and reports summarize income and outstanding debt per billing month.
#[derive(Parser, Debug)]
#[command(version, long_about)]
struct HousingLedger {
    /// CSV file with one debt ledger per owner (`owner_id,water,electric`).
    /// Created on first write if it does not exist.
    #[arg(long, default_value = "ledgers.csv")]
    ledgers: PathBuf,
    /// CSV file with the accrual and payment log (`owner_id,period,accrued,paid_for`).
    #[arg(long, default_value = "payments.csv")]
    payments: PathBuf,
    /// Accept payments larger than the outstanding debt and report the excess,
    /// instead of refusing them.
    #[arg(long)]
    allow_overpayment: bool,
    /// Delete an owner's ledger once it is fully paid.
    #[arg(long)]
    prune_settled: bool,
    #[command(flatten)]
    session: SessionArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct SessionArgs {
    #[arg(long, default_value_t = 1)]
    user_id: u32,
    #[arg(long, default_value = "Administrator")]
    user_name: String,
    /// One of administrator, manager, employee, resident.
    #[arg(long, default_value = "administrator")]
    role: Role,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Bill an owner for water or electricity.
    Accrue {
        owner: OwnerId,
        category: ServiceCategory,
        amount: BigDecimal,
        /// Billing month as MM.yyyy, defaults to the current month.
        #[arg(long)]
        period: Option<Period>,
    },
    /// Record a payment against an owner's debt.
    Pay {
        owner: OwnerId,
        amount: BigDecimal,
        #[arg(long)]
        period: Option<Period>,
    },
    /// Pay an owner's whole outstanding debt.
    PayInFull {
        owner: OwnerId,
        #[arg(long)]
        period: Option<Period>,
    },
    /// Print one owner's ledger.
    Show { owner: OwnerId },
    /// List owners with outstanding debt, largest first.
    Debtors,
    /// Income and debt figures for a month, quarter or year.
    Report {
        #[arg(value_enum)]
        kind: ReportKind,
        #[arg(long)]
        period: Option<Period>,
        /// Year for the annual report, defaults to the year of `--period`.
        #[arg(long)]
        year: Option<i16>,
        /// How many months back the monthly trend reaches.
        #[arg(long, default_value_t = 6)]
        months: u32,
    },
}

#[derive(ValueEnum, Copy, Clone, PartialEq, Eq, Debug)]
enum ReportKind {
    Summary,
    Monthly,
    Quarterly,
    Annual,
}

impl HousingLedger {
    fn options(&self) -> BookOptions {
        BookOptions {
            overpayment: if self.allow_overpayment {
                OverpaymentPolicy::ReturnRemainder
            } else {
                OverpaymentPolicy::Reject
            },
            settled: if self.prune_settled {
                SettledLedgerPolicy::Prune
            } else {
                SettledLedgerPolicy::Retain
            },
        }
    }

    fn session(&self) -> Session {
        Session::new(
            self.session.user_id,
            self.session.user_name.clone(),
            self.session.role,
        )
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = HousingLedger::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &HousingLedger) -> Result<()> {
    let session = args.session();
    let mut book = load_book(&args.ledgers, &args.payments, args.options())?;

    match &args.command {
        Command::Accrue {
            owner,
            category,
            amount,
            period,
        } => {
            let period = period.unwrap_or_else(Period::current);
            let ledger = book.create_accrual(&session, *owner, period, *category, amount.clone())?;
            println!(
                "Owner {} now owes {:.2} (water {:.2}, electric {:.2})",
                ledger.owner_id,
                ledger.total(),
                ledger.water(),
                ledger.electric()
            );
            save_book(&book, &args.ledgers, &args.payments)
        }
        Command::Pay {
            owner,
            amount,
            period,
        } => {
            let period = period.unwrap_or_else(Period::current);
            let receipt = book.process_payment(&session, *owner, period, amount.clone())?;
            print_receipt(&receipt);
            save_book(&book, &args.ledgers, &args.payments)
        }
        Command::PayInFull { owner, period } => {
            let period = period.unwrap_or_else(Period::current);
            let receipt = book.pay_in_full(&session, *owner, period)?;
            print_receipt(&receipt);
            save_book(&book, &args.ledgers, &args.payments)
        }
        Command::Show { owner } => {
            let ledger = book.view_ledger(&session, *owner)?;
            println!(
                "Owner {}: water {:.2}, electric {:.2}, total {:.2}",
                ledger.owner_id,
                ledger.water(),
                ledger.electric(),
                ledger.total()
            );
            Ok(())
        }
        Command::Debtors => {
            report::authorize(&session)?;
            print_debtors(&report::debtors(&book));
            Ok(())
        }
        Command::Report {
            kind,
            period,
            year,
            months,
        } => {
            report::authorize(&session)?;
            let period = period.unwrap_or_else(Period::current);
            print_report(&book, *kind, period, year.unwrap_or(period.year()), *months);
            Ok(())
        }
    }
}

fn print_receipt(receipt: &PaymentReceipt) {
    println!(
        "Payment of {:.2} for owner {} ({}): water {:.2}, electric {:.2}",
        receipt.amount,
        receipt.owner_id,
        receipt.period,
        receipt.water_applied,
        receipt.electric_applied
    );
    println!("Remaining debt: {:.2}", receipt.remaining_debt);
    if receipt.remainder > BigDecimal::from(0) {
        println!("Unapplied remainder: {:.2}", receipt.remainder);
    }
}

fn print_debtors(debtors: &[Debtor]) {
    if debtors.is_empty() {
        println!("No outstanding debt");
        return;
    }
    for debtor in debtors {
        println!(
            "{:>6}  total {:>12.2}  water {:>12.2}  electric {:>12.2}",
            debtor.owner_id, debtor.total, debtor.water, debtor.electric
        );
    }
}

fn print_report(book: &Book, kind: ReportKind, period: Period, year: i16, months: u32) {
    match kind {
        ReportKind::Summary => {
            let summary = report::summary(book, period);
            println!("Period:           {}", summary.period);
            println!("Income:           {:.2}", summary.period_income);
            println!("Total accrued:    {:.2}", summary.total_accrued);
            println!("Total paid:       {:.2}", summary.total_paid);
            println!("Average payment:  {:.2}", summary.average_payment);
            println!("Total debt:       {:.2}", summary.total_debt);
            println!("Debtors:          {}", summary.debtor_count);
            println!("Records:          {}", summary.record_count);
        }
        ReportKind::Monthly => {
            let start = period.previous(months);
            let trend = report::income_trend(book.payments().iter(), start, period);
            println!("Income {} - {}", start, period);
            for row in &trend {
                println!("{}  {:>12.2}", row.period, row.income);
            }
        }
        ReportKind::Quarterly => {
            let quarter = report::quarterly(book.payments().iter(), period);
            println!("Period:           {} - {}", quarter.start, quarter.end);
            println!("Income:           {:.2}", quarter.income);
            println!("Monthly average:  {:.2}", quarter.average_monthly_income);
        }
        ReportKind::Annual => {
            let annual = report::annual(book.payments().iter(), year);
            println!("Year:             {}", annual.year);
            println!("Income:           {:.2}", annual.income);
            for (quarter, income) in annual.quarters.iter().enumerate() {
                println!("  Q{}:             {:.2}", quarter + 1, income);
            }
            println!("Monthly average:  {:.2}", annual.average_monthly_income);
        }
    }
}
