use std::io::Write;

use super::{DriverError, RunSummary, SCRATCH_TABLE};
use crate::{
    buffer::{reserve, KeyBuffer, ValueBuffer},
    client::{Client, ClientError, Connect, ErrorKind, TableId, Transaction},
    observability::{log_debug, log_info, log_warn},
    option::Config,
    timer::{timed, Reporter},
};

pub(super) fn run<C, W>(
    connector: &C,
    config: &Config,
    reporter: &mut Reporter<W>,
) -> Result<RunSummary, DriverError>
where
    C: Connect,
    W: Write,
{
    log_info!(component = "driver", event = "connecting", locator = %config.locator());
    let mut client = connector.connect(config.locator())?;
    let table = match client.create_table(SCRATCH_TABLE) {
        Ok(table) => table,
        Err(err) => {
            release(client);
            return Err(err.into());
        }
    };
    log_debug!(
        component = "driver",
        event = "scratch_table_created",
        table = SCRATCH_TABLE,
        id = table.get(),
    );

    let mut bench = match ReadBench::new(config, table) {
        Ok(bench) => bench,
        Err(err) => {
            discard(client);
            return Err(err);
        }
    };
    let outcome = bench
        .populate(&mut client)
        .and_then(|()| bench.measure(&mut client, reporter));

    match outcome {
        Ok(()) => {
            let dropped = client.drop_table(SCRATCH_TABLE);
            let disconnected = client.disconnect();
            dropped?;
            disconnected?;
            log_debug!(
                component = "driver",
                event = "read_finished",
                samples = bench.summary.samples,
                exceptions = bench.summary.exceptions,
            );
            Ok(bench.summary)
        }
        Err(err) => {
            log_warn!(component = "driver", event = "run_failed", error = %err);
            discard(client);
            Err(err)
        }
    }
}

/// Best-effort teardown after a failure: drop the scratch table, then disconnect.
fn discard<C: Client>(mut client: C) {
    if let Err(err) = client.drop_table(SCRATCH_TABLE) {
        log_warn!(
            component = "driver",
            event = "scratch_table_leaked",
            table = SCRATCH_TABLE,
            error = %err,
        );
    }
    release(client);
}

fn release<C: Client>(client: C) {
    if let Err(err) = client.disconnect() {
        log_warn!(component = "driver", event = "disconnect_failed", error = %err);
    }
}

/// Buffers and counters of one read run.
struct ReadBench<'a> {
    config: &'a Config,
    table: TableId,
    key: KeyBuffer,
    value: ValueBuffer,
    /// Destination of every read, sized for one value up front.
    fetched: Vec<u8>,
    summary: RunSummary,
}

impl<'a> ReadBench<'a> {
    fn new(config: &'a Config, table: TableId) -> Result<Self, DriverError> {
        Ok(Self {
            config,
            table,
            key: KeyBuffer::new(config.key_size)?,
            value: ValueBuffer::new(config.value_size)?,
            fetched: reserve(config.value_size)?,
            summary: RunSummary::default(),
        })
    }

    fn populate<C: Client>(&mut self, client: &mut C) -> Result<(), DriverError> {
        if self.config.nonexistent {
            log_debug!(component = "driver", event = "populate_skipped");
            return Ok(());
        }

        if self.config.transactional {
            for index in 0..self.config.objects_per_tx {
                self.key.set_index(index);
                client.write(self.table, self.key.as_bytes(), self.value.as_bytes(), None)?;
            }
        } else {
            self.key.zero();
            client.write(self.table, self.key.as_bytes(), self.value.as_bytes(), None)?;
        }
        Ok(())
    }

    fn measure<C, W>(&mut self, client: &mut C, reporter: &mut Reporter<W>) -> Result<(), DriverError>
    where
        C: Client,
        W: Write,
    {
        if self.config.transactional && self.config.reuse {
            self.measure_reused_transaction(client, reporter)
        } else if self.config.transactional {
            self.measure_transactions(client, reporter)
        } else {
            self.measure_direct(client, reporter)
        }
    }

    fn measure_direct<C, W>(
        &mut self,
        client: &mut C,
        reporter: &mut Reporter<W>,
    ) -> Result<(), DriverError>
    where
        C: Client,
        W: Write,
    {
        self.key.zero();
        for _ in 0..self.config.count {
            let (result, sample) =
                timed(|| client.read(self.table, self.key.as_bytes(), &mut self.fetched));
            self.tolerate(result)?;
            self.summary.samples += 1;
            if self.config.count_exceptions {
                reporter.counted(sample, self.summary.exceptions)?;
            } else {
                reporter.single(sample)?;
            }
        }
        Ok(())
    }

    fn measure_transactions<C, W>(
        &mut self,
        client: &mut C,
        reporter: &mut Reporter<W>,
    ) -> Result<(), DriverError>
    where
        C: Client,
        W: Write,
    {
        for _ in 0..self.config.count {
            let mut tx = client.begin_transaction()?;
            let outcome = self.transaction_body(&mut tx, reporter);
            tx.close();
            outcome?;
            self.summary.transactions += 1;
        }
        Ok(())
    }

    /// One transaction carries every round, so later reads hit its read set.
    fn measure_reused_transaction<C, W>(
        &mut self,
        client: &mut C,
        reporter: &mut Reporter<W>,
    ) -> Result<(), DriverError>
    where
        C: Client,
        W: Write,
    {
        if self.config.count == 0 {
            return Ok(());
        }
        let mut tx = client.begin_transaction()?;
        let outcome = self.reused_body(&mut tx, reporter);
        tx.close();
        outcome?;
        self.summary.transactions += 1;
        Ok(())
    }

    fn reused_body<T, W>(&mut self, tx: &mut T, reporter: &mut Reporter<W>) -> Result<(), DriverError>
    where
        T: Transaction,
        W: Write,
    {
        for _ in 0..self.config.count {
            self.read_round(tx, reporter)?;
        }
        self.finish(tx)
    }

    /// Reads every object once, then commits unless rolling back. Closing is left to
    /// the caller so it happens on every path.
    fn transaction_body<T, W>(
        &mut self,
        tx: &mut T,
        reporter: &mut Reporter<W>,
    ) -> Result<(), DriverError>
    where
        T: Transaction,
        W: Write,
    {
        self.read_round(tx, reporter)?;
        self.finish(tx)
    }

    /// One timed read of each object, followed by a separator for multi-object rounds.
    fn read_round<T, W>(&mut self, tx: &mut T, reporter: &mut Reporter<W>) -> Result<(), DriverError>
    where
        T: Transaction,
        W: Write,
    {
        for index in 0..self.config.objects_per_tx {
            self.key.set_index(index);
            let (result, sample) =
                timed(|| tx.read(self.table, self.key.as_bytes(), &mut self.fetched));
            self.tolerate(result)?;
            self.summary.samples += 1;
            reporter.indexed(index, sample)?;
        }

        if self.config.objects_per_tx > 1 {
            reporter.separator()?;
        }
        Ok(())
    }

    fn finish<T: Transaction>(&mut self, tx: &mut T) -> Result<(), DriverError> {
        if !self.config.rollback {
            tx.commit_and_sync()?;
            self.summary.commits += 1;
        }
        Ok(())
    }

    /// Missing objects are expected when reading nonexistent keys; they are counted and
    /// the loop goes on. Anything else ends the run.
    fn tolerate(&mut self, result: Result<(), ClientError>) -> Result<(), ClientError> {
        match result {
            Err(err) if err.kind() == ErrorKind::ObjectDoesNotExist => {
                self.summary.exceptions += 1;
                Ok(())
            }
            other => other,
        }
    }
}
