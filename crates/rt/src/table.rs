//! Text rendering of dumped tables.

use crate::flags::Legend;
use crate::record::RouteRecord;
use std::io::{self, Write};
use vrouter_types::AddressFamily;

const IP_DESTINATION_WIDTH: usize = 21;
const BRIDGE_INDEX_WIDTH: usize = 12;
const BRIDGE_MAC_WIDTH: usize = 20;
const BRIDGE_FLAGS_WIDTH: usize = 10;
const BRIDGE_LABEL_WIDTH: usize = 20;

/// Writes a dump of one table as a fixed-width text table.
pub struct TablePrinter<W: Write> {
    out: W,
    family: AddressFamily,
    vrf_id: i32,
    rows: u64,
}

impl<W: Write> TablePrinter<W> {
    pub fn new(out: W, family: AddressFamily, vrf_id: i32) -> Self {
        Self {
            out,
            family,
            vrf_id,
            rows: 0,
        }
    }

    /// Title, flag legend and column header.
    pub fn header(&mut self) -> io::Result<()> {
        match self.family {
            AddressFamily::Inet | AddressFamily::Inet6 => {
                writeln!(
                    self.out,
                    "Vrouter {} routing table 0/{}/unicast",
                    self.family.table_label(),
                    self.vrf_id
                )?;
                writeln!(self.out, "{}\n", Legend(self.family))?;
                writeln!(
                    self.out,
                    "{:<w$} PPL        Flags        Label         Nexthop    Stitched MAC(Index)",
                    "Destination",
                    w = IP_DESTINATION_WIDTH,
                )
            }
            AddressFamily::Bridge => {
                writeln!(self.out, "Kernel L2 Bridge table 0/{}\n", self.vrf_id)?;
                writeln!(self.out, "{}\n", Legend(self.family))?;
                writeln!(
                    self.out,
                    "Index       DestMac                  Flags           Label/VNID      Nexthop"
                )
            }
        }
    }

    /// One table row.
    pub fn row(&mut self, record: &RouteRecord) -> io::Result<()> {
        self.rows += 1;
        if record.family().is_ip() {
            self.ip_row(record)
        } else {
            self.bridge_row(record)
        }
    }

    fn ip_row(&mut self, record: &RouteRecord) -> io::Result<()> {
        let destination = match record.key.ip() {
            Some(addr) => format!("{}/{:<2}", addr, record.key.prefix_len()),
            None => String::new(),
        };
        let label = match record.label {
            Some(label) => label.to_string(),
            None => "-".to_string(),
        };
        let stitched = match &record.stitched_mac {
            Some(stitched) => match stitched.index {
                Some(index) => format!("{}({})", stitched.mac, index),
                None => stitched.mac.to_string(),
            },
            None => "-".to_string(),
        };

        writeln!(
            self.out,
            "{:<dw$}{:>4}        {:>5}      {:>5}        {:>7}        {}",
            destination,
            record.replace_prefix_len,
            record.flags.symbols(),
            label,
            record.next_hop_id,
            stitched,
            dw = IP_DESTINATION_WIDTH,
        )
    }

    fn bridge_row(&mut self, record: &RouteRecord) -> io::Result<()> {
        let index = record.entry_index.unwrap_or(-1);
        let mac = record
            .key
            .mac()
            .map(|mac| mac.to_string())
            .unwrap_or_default();
        let flags = format!(" {:>8}", record.flags.symbols());
        let label = match record.label {
            Some(label) => format!(" {label:>16}"),
            None => format!(" {:>16}", '-'),
        };

        writeln!(
            self.out,
            "{:<iw$}{:<mw$}{:<fw$}{:<lw$} {:>10}",
            format!("{index:<9}"),
            mac,
            flags,
            label,
            record.next_hop_id,
            iw = BRIDGE_INDEX_WIDTH,
            mw = BRIDGE_MAC_WIDTH,
            fw = BRIDGE_FLAGS_WIDTH,
            lw = BRIDGE_LABEL_WIDTH,
        )
    }

    /// Rows written so far.
    pub fn rows(&self) -> u64 {
        self.rows
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Writes the header and every record of `records`.
pub fn render<W, I>(out: W, family: AddressFamily, vrf_id: i32, records: I) -> io::Result<W>
where
    W: Write,
    I: IntoIterator<Item = RouteRecord>,
{
    let mut printer = TablePrinter::new(out, family, vrf_id);
    printer.header()?;
    for record in records {
        printer.row(&record)?;
    }
    printer.flush()?;
    Ok(printer.into_inner())
}
