//! CSV files backing a [`Book`].
//!
//! Ledgers: `owner_id,water,electric`. Payments: `owner_id,period,accrued,paid_for`.

use crate::book::{Book, BookOptions};
use crate::error::{BillingError, Result};
use crate::ledger::{DebtLedger, OwnerId};
use crate::payment::PaymentRecord;
use bigdecimal::{BigDecimal, Zero};
use csv::StringRecord;
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;

static LEDGER_HEADERS: LazyLock<StringRecord> =
    LazyLock::new(|| StringRecord::from(vec!["owner_id", "water", "electric"]));

static PAYMENT_HEADERS: LazyLock<StringRecord> =
    LazyLock::new(|| StringRecord::from(vec!["owner_id", "period", "accrued", "paid_for"]));

pub fn load_book(ledgers: &Path, payments: &Path, options: BookOptions) -> Result<Book> {
    let ledgers = match open_optional(ledgers)? {
        Some(file) => read_ledgers(file)?,
        None => Vec::new(),
    };
    let payments = match open_optional(payments)? {
        Some(file) => read_payments(file)?,
        None => Vec::new(),
    };
    log::debug!("loaded {} ledgers and {} payment rows", ledgers.len(), payments.len());
    Ok(Book::from_parts(ledgers, payments, options))
}

/// Replaces both files as one unit.
///
/// Both files are written to temporaries before either target is touched. The
/// payment log is swapped in first; if the ledgers cannot be swapped in after
/// it, the previous payment log is put back.
pub fn save_book(book: &Book, ledgers: &Path, payments: &Path) -> Result<()> {
    let ledgers_tmp = write_staged(ledgers, |out| write_ledgers(out, book.ledgers()))?;
    let payments_tmp = write_staged(payments, |out| write_payments(out, book.payments().iter()))?;
    let backup = back_up(payments)?;

    fs::rename(&payments_tmp.0, payments)?;
    if let Err(e) = fs::rename(&ledgers_tmp.0, ledgers) {
        log::warn!("could not replace {}, restoring {}", ledgers.display(), payments.display());
        match &backup {
            Some(backup) => fs::rename(&backup.0, payments)?,
            None => fs::remove_file(payments)?,
        }
        return Err(e.into());
    }
    Ok(())
}

/// A file next to a target that is deleted when dropped, unless it was renamed away.
struct Staged(PathBuf);

impl Staged {
    fn beside(path: &Path, suffix: &str) -> Self {
        let mut staged = PathBuf::from(path);
        staged.as_mut_os_string().push(suffix);
        Self(staged)
    }
}

impl Drop for Staged {
    fn drop(&mut self) {
        // Already renamed onto its target on the success path.
        let _ = fs::remove_file(&self.0);
    }
}

fn write_staged(path: &Path, write: impl FnOnce(&mut File) -> Result<()>) -> Result<Staged> {
    let staged = Staged::beside(path, ".tmp");
    let mut file = File::create(&staged.0)?;
    write(&mut file)?;
    file.sync_all()?;
    Ok(staged)
}

fn back_up(path: &Path) -> Result<Option<Staged>> {
    let backup = Staged::beside(path, ".bak");
    match fs::copy(path, &backup.0) {
        Ok(_) => Ok(Some(backup)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn open_optional(path: &Path) -> Result<Option<File>> {
    match File::open(path) {
        Ok(file) => Ok(Some(file)),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            log::debug!("{} does not exist yet, starting empty", path.display());
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

fn check_headers(reader: &mut csv::Reader<impl Read>, expected: &StringRecord) -> Result<()> {
    let headers = reader.headers()?;
    if headers != expected {
        return Err(BillingError::UnexpectedHeaders {
            found: headers.iter().map(str::to_string).collect(),
            expected: expected.iter().map(str::to_string).collect(),
        });
    }
    Ok(())
}

fn field<T: FromStr>(record: &StringRecord, index: usize, name: &str) -> Result<T> {
    let line = record.position().map_or(0, |p| p.line());
    let raw = record.get(index).ok_or_else(|| BillingError::Parse {
        line,
        message: format!("missing {}", name),
    })?;
    raw.trim().parse().map_err(|_| BillingError::Parse {
        line,
        message: format!("invalid {} {:?}", name, raw),
    })
}

pub fn read_ledgers(input: impl Read) -> Result<Vec<DebtLedger>> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(input);
    check_headers(&mut reader, &LEDGER_HEADERS)?;
    let mut seen = HashSet::new();
    reader
        .into_records()
        .map(|r| {
            let record = r?;
            let line = record.position().map_or(0, |p| p.line());
            let owner_id: OwnerId = field(&record, 0, "owner id")?;
            if !seen.insert(owner_id) {
                return Err(BillingError::Parse {
                    line,
                    message: format!("owner {} already has a ledger", owner_id),
                });
            }
            DebtLedger::with_balances(
                owner_id,
                field(&record, 1, "water balance")?,
                field(&record, 2, "electric balance")?,
            )
            .map_err(|e| BillingError::Parse {
                line,
                message: e.to_string(),
            })
        })
        .collect()
}

pub fn read_payments(input: impl Read) -> Result<Vec<PaymentRecord>> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(input);
    check_headers(&mut reader, &PAYMENT_HEADERS)?;
    reader
        .into_records()
        .map(|r| {
            let record = r?;
            let line = record.position().map_or(0, |p| p.line());
            let payment = PaymentRecord {
                owner_id: field(&record, 0, "owner id")?,
                period: field(&record, 1, "period")?,
                accrued: field(&record, 2, "accrued amount")?,
                paid_for: field(&record, 3, "paid amount")?,
            };
            let zero = BigDecimal::zero();
            if payment.accrued < zero || payment.paid_for < zero {
                return Err(BillingError::Parse {
                    line,
                    message: "amounts must not be negative".to_string(),
                });
            }
            // A row either bills or pays, never both.
            if payment.accrued != zero && payment.paid_for != zero {
                return Err(BillingError::Parse {
                    line,
                    message: "row has both an accrued and a paid amount".to_string(),
                });
            }
            Ok(payment)
        })
        .collect()
}

pub fn write_ledgers<'a>(
    output: impl Write,
    ledgers: impl Iterator<Item = &'a DebtLedger>,
) -> Result<()> {
    let mut writer = csv::Writer::from_writer(output);
    writer.write_record(&*LEDGER_HEADERS)?;
    for ledger in ledgers {
        writer.write_record([
            ledger.owner_id.to_string(),
            ledger.water().to_string(),
            ledger.electric().to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_payments<'a>(
    output: impl Write,
    payments: impl Iterator<Item = &'a PaymentRecord>,
) -> Result<()> {
    let mut writer = csv::Writer::from_writer(output);
    writer.write_record(&*PAYMENT_HEADERS)?;
    for payment in payments {
        writer.write_record([
            payment.owner_id.to_string(),
            payment.period.to_string(),
            payment.accrued.to_string(),
            payment.paid_for.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::period::Period;
    use crate::session::{Role, Session};
    use std::io::Cursor;

    const LEDGERS: &str = "owner_id,water,electric\n3,40,10\n";
    const PAYMENTS: &str = "owner_id,period,accrued,paid_for\n3,01.2024,50,0\n";

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn reads_ledgers() {
        let input = "owner_id,water,electric\n1,100.50,20\n2, 0 ,0\n";
        let ledgers = read_ledgers(Cursor::new(input)).unwrap();
        assert_eq!(ledgers.len(), 2);
        assert_eq!(*ledgers[0].water(), dec("100.50"));
        assert!(ledgers[1].is_settled());
    }

    #[test]
    fn reads_payments() {
        let input = "owner_id,period,accrued,paid_for\n1,03.2024,0,75.25\n";
        let payments = read_payments(Cursor::new(input)).unwrap();
        assert_eq!(payments[0].period.to_string(), "03.2024");
        assert_eq!(payments[0].paid_for, dec("75.25"));
    }

    #[test]
    fn rejects_unexpected_headers() {
        let input = "owner,water,electric\n1,1,1\n";
        assert!(matches!(
            read_ledgers(Cursor::new(input)),
            Err(BillingError::UnexpectedHeaders { .. })
        ));
    }

    #[test]
    fn reports_bad_rows_with_line_numbers() {
        let input = "owner_id,period,accrued,paid_for\n1,03.2024,0,5\n2,2024-03,0,5\n";
        match read_payments(Cursor::new(input)) {
            Err(BillingError::Parse { line, message }) => {
                assert_eq!(line, 3);
                assert!(message.contains("period"), "{message}");
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn negative_balance_row_is_rejected() {
        let input = "owner_id,water,electric\n1,-5,0\n";
        assert!(matches!(
            read_ledgers(Cursor::new(input)),
            Err(BillingError::Parse { line: 2, .. })
        ));
    }

    #[test]
    fn repeated_owner_is_rejected() {
        let input = "owner_id,water,electric\n3,40,10\n3,5,5\n";
        match read_ledgers(Cursor::new(input)) {
            Err(BillingError::Parse { line, message }) => {
                assert_eq!(line, 3);
                assert!(message.contains("owner 3"), "{message}");
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn negative_payment_amounts_are_rejected() {
        for row in ["1,03.2024,-10,0", "1,03.2024,0,-50", "1,03.2024,-10,-50"] {
            let input = format!("owner_id,period,accrued,paid_for\n{}\n", row);
            let loaded = read_payments(Cursor::new(input));
            assert!(
                matches!(loaded, Err(BillingError::Parse { line: 2, .. })),
                "{row} should not load"
            );
        }
    }

    #[test]
    fn row_cannot_both_bill_and_pay() {
        let input = "owner_id,period,accrued,paid_for\n1,03.2024,10,5\n";
        assert!(matches!(
            read_payments(Cursor::new(input)),
            Err(BillingError::Parse { line: 2, .. })
        ));
    }

    fn paid_book(dir: &Path) -> (PathBuf, PathBuf, Book) {
        let ledgers = dir.join("ledgers.csv");
        let payments = dir.join("payments.csv");
        fs::write(&ledgers, LEDGERS).unwrap();
        fs::write(&payments, PAYMENTS).unwrap();
        let mut book = load_book(&ledgers, &payments, BookOptions::default()).unwrap();
        let admin = Session::new(1, "Admin", Role::Administrator);
        let period: Period = "02.2024".parse().unwrap();
        book.process_payment(&admin, 3, period, dec("30")).unwrap();
        (ledgers, payments, book)
    }

    fn block_with_directory(path: &Path) {
        fs::remove_file(path).unwrap();
        fs::create_dir(path).unwrap();
        fs::write(path.join("keep"), "").unwrap();
    }

    fn file_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn ledger_is_not_saved_without_its_payment_row() {
        let dir = tempfile::tempdir().unwrap();
        let (ledgers, payments, book) = paid_book(dir.path());
        block_with_directory(&payments);

        assert!(save_book(&book, &ledgers, &payments).is_err());
        assert_eq!(fs::read_to_string(&ledgers).unwrap(), LEDGERS);
        assert_eq!(file_names(dir.path()), ["ledgers.csv", "payments.csv"]);
    }

    #[test]
    fn payment_log_is_restored_when_ledgers_cannot_be_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let (ledgers, payments, book) = paid_book(dir.path());
        block_with_directory(&ledgers);

        assert!(save_book(&book, &ledgers, &payments).is_err());
        assert_eq!(fs::read_to_string(&payments).unwrap(), PAYMENTS);
        assert_eq!(file_names(dir.path()), ["ledgers.csv", "payments.csv"]);
    }

    #[test]
    fn saved_book_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let (ledgers, payments, book) = paid_book(dir.path());

        save_book(&book, &ledgers, &payments).unwrap();
        let loaded = load_book(&ledgers, &payments, BookOptions::default()).unwrap();
        assert_eq!(loaded.ledger(3).unwrap().total(), dec("20"));
        assert_eq!(loaded.payments(), book.payments());
        assert_eq!(file_names(dir.path()), ["ledgers.csv", "payments.csv"]);
    }
}
