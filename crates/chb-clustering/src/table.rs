use super::*;
use chb_core::*;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

const CONTIG: &str = "CONTIG_NAME";
const PARENT: &str = "PARENT_NAME";
const CLUSTER: &str = "CLUSTER";
const SPECIES: &str = "SPECIES";
const BIN: &str = "BIN";

/// Fragment feature table.
///
/// One row per fragment: its name, the contig it was cut from, a seed
/// cluster (−1 when unseeded) and D numeric features. Columns are found by
/// header name; every column that is not one of the three named ones is a
/// feature, in file order.
#[derive(Debug, Clone)]
pub struct Table {
    names: Vec<String>,
    parents: Vec<String>,
    labels: Labels,
    samples: Samples,
    features: Vec<String>,
}

impl Table {
    pub fn read(path: &Path) -> Result<Self> {
        log::info!("{:<32}{:<32}", "reading feature table", path.display());
        Self::parse(std::fs::File::open(path)?)
    }

    pub fn parse(reader: impl Read) -> Result<Self> {
        let mut reader = csv_reader(reader);
        let header = reader.headers().map_err(malformed)?.clone();
        let contig = column(&header, CONTIG)?;
        let parent = column(&header, PARENT)?;
        let cluster = column(&header, CLUSTER)?;
        let features = (0..header.len())
            .filter(|&c| c != contig && c != parent && c != cluster)
            .collect::<Vec<usize>>();
        if features.is_empty() {
            return Err(Error::Table {
                line: 1,
                reason: "no feature columns".to_string(),
            });
        }
        let mut names = Vec::new();
        let mut parents = Vec::new();
        let mut labels = Vec::new();
        let mut values = Vec::new();
        for record in reader.records() {
            let record = record.map_err(malformed)?;
            let line = line(&record);
            let bad = |reason: String| Error::Table { line, reason };
            if record.len() != header.len() {
                return Err(bad(format!(
                    "expected {} fields, found {}",
                    header.len(),
                    record.len()
                )));
            }
            let raw = record[cluster]
                .parse::<i64>()
                .map_err(|_| bad(format!("cluster {:?} is not an integer", &record[cluster])))?;
            let label = Label::try_from(raw)
                .map_err(|l| bad(format!("cluster {} is neither {} nor a bin id", l, UNASSIGNED)))?;
            for &c in features.iter() {
                let value = record[c]
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| bad(format!("feature {} = {:?} is not a finite number", &header[c], &record[c])))?;
                values.push(value);
            }
            names.push(record[contig].to_string());
            parents.push(record[parent].to_string());
            labels.push(label);
        }
        if names.is_empty() {
            return Err(Error::Table {
                line: 2,
                reason: "no fragments".to_string(),
            });
        }
        let table = Self {
            samples: Samples::try_from((features.len(), values))?,
            features: features.iter().map(|&c| header[c].to_string()).collect(),
            labels: Labels::from(labels),
            names,
            parents,
        };
        log::info!(
            "{:<32}{:<32}",
            "feature table",
            format!(
                "{} fragments {} features {} seeded",
                table.samples.n(),
                table.samples.d(),
                table.labels.iter().filter(|l| l.is_assigned()).count()
            )
        );
        Ok(table)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
    pub fn parents(&self) -> &[String] {
        &self.parents
    }
    pub fn labels(&self) -> &Labels {
        &self.labels
    }
    pub fn samples(&self) -> &Samples {
        &self.samples
    }
    pub fn features(&self) -> &[String] {
        &self.features
    }
}

/// Writes one `CONTIG_NAME,BIN` row per parent contig.
pub fn write_bins(path: &Path, bins: &BTreeMap<String, Bin>) -> Result<()> {
    let ref mut out = csv_writer(path)?;
    out.write_record([CONTIG, BIN]).map_err(std::io::Error::from)?;
    for (contig, bin) in bins {
        out.write_record([contig.as_str(), bin.to_string().as_str()])
            .map_err(std::io::Error::from)?;
    }
    out.flush()?;
    log::info!("{:<32}{:<32}", "wrote bins", path.display());
    Ok(())
}

/// Writes one `CONTIG_NAME,PARENT_NAME,BIN` row per fragment.
pub fn write_labels(path: &Path, table: &Table, bins: &[Bin]) -> Result<()> {
    if bins.len() != table.names.len() {
        return Err(Error::DimensionMismatch {
            expected: table.names.len(),
            got: bins.len(),
        });
    }
    let ref mut out = csv_writer(path)?;
    out.write_record([CONTIG, PARENT, BIN]).map_err(std::io::Error::from)?;
    for ((name, parent), bin) in table.names.iter().zip(table.parents.iter()).zip(bins) {
        out.write_record([name.as_str(), parent.as_str(), bin.to_string().as_str()])
            .map_err(std::io::Error::from)?;
    }
    out.flush()?;
    log::info!("{:<32}{:<32}", "wrote fragment labels", path.display());
    Ok(())
}

/// Reads a `CONTIG_NAME,SPECIES` ground truth table.
pub fn read_truth(path: &Path) -> Result<BTreeMap<String, String>> {
    parse_truth(std::fs::File::open(path)?)
}

pub fn parse_truth(reader: impl Read) -> Result<BTreeMap<String, String>> {
    let mut reader = csv_reader(reader);
    let header = reader.headers().map_err(malformed)?.clone();
    let contig = column(&header, CONTIG)?;
    let species = column(&header, SPECIES)?;
    reader
        .records()
        .map(|record| {
            let record = record.map_err(malformed)?;
            match (record.get(contig), record.get(species)) {
                (Some(c), Some(s)) => Ok((c.to_string(), s.to_string())),
                _ => Err(Error::Table {
                    line: line(&record),
                    reason: format!("expected {} fields, found {}", header.len(), record.len()),
                }),
            }
        })
        .collect()
}

/// Headered, whitespace-trimmed reader. Row widths are checked by the
/// callers so that short rows report their own line.
fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader)
}

fn csv_writer(path: &Path) -> Result<csv::Writer<std::fs::File>> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    Ok(csv::Writer::from_writer(std::fs::File::create(path)?))
}

fn column(header: &csv::StringRecord, name: &str) -> Result<usize> {
    header.iter().position(|h| h == name).ok_or_else(|| Error::Table {
        line: 1,
        reason: format!("missing {} column", name),
    })
}

fn line(record: &csv::StringRecord) -> usize {
    record.position().map_or(1, |p| p.line() as usize)
}

/// Syntax and encoding errors become line-numbered table errors.
fn malformed(e: csv::Error) -> Error {
    let line = e.position().map_or(1, |p| p.line() as usize);
    let reason = e.to_string();
    match e.into_kind() {
        csv::ErrorKind::Io(e) => Error::Io(e),
        _ => Error::Table { line, reason },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEATURES: &str = "\
CONTIG_NAME,PARENT_NAME,CLUSTER,k1,k2
c1_0,c1,0,0.5,1.5
c1_1,c1,-1,1.0,2.0

c2_0,c2,1,-3,4e-1
";

    #[test]
    fn parses_sentinel_and_features() {
        let table = Table::parse(FEATURES.as_bytes()).unwrap();
        assert_eq!(table.names(), &["c1_0", "c1_1", "c2_0"]);
        assert_eq!(table.parents(), &["c1", "c1", "c2"]);
        assert_eq!(table.features(), &["k1", "k2"]);
        assert_eq!(
            table.labels(),
            &Labels::from(vec![Label::Bin(0), Label::Unassigned, Label::Bin(1)])
        );
        assert_eq!(table.samples().row(2), &[-3., 0.4]);
    }

    #[test]
    fn finds_columns_by_name() {
        let csv = "k1,CLUSTER,CONTIG_NAME,PARENT_NAME\n2.5,3,a_0,a\n";
        let table = Table::parse(csv.as_bytes()).unwrap();
        assert_eq!(table.names(), &["a_0"]);
        assert_eq!(table.labels().get(0), Label::Bin(3));
        assert_eq!(table.samples().row(0), &[2.5]);
    }

    #[test]
    fn reports_bad_lines() {
        let cases = [
            ("CONTIG_NAME,PARENT_NAME,k1\na,a,1\n", 1),
            ("CONTIG_NAME,PARENT_NAME,CLUSTER\na,a,1\n", 1),
            ("CONTIG_NAME,PARENT_NAME,CLUSTER,k1\na,a,-2,1\n", 2),
            ("CONTIG_NAME,PARENT_NAME,CLUSTER,k1\na,a,0,1\nb,b,x,1\n", 3),
            ("CONTIG_NAME,PARENT_NAME,CLUSTER,k1\na,a,0,nan\n", 2),
            ("CONTIG_NAME,PARENT_NAME,CLUSTER,k1\na,a,0\n", 2),
        ];
        for (csv, expected) in cases {
            match Table::parse(csv.as_bytes()) {
                Err(Error::Table { line, .. }) => assert_eq!(line, expected, "{}", csv),
                other => panic!("{:?} for {}", other.map(|t| t.names().to_vec()), csv),
            }
        }
    }

    #[test]
    fn writes_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let table = Table::parse(FEATURES.as_bytes()).unwrap();
        let ref labels = dir.path().join("out").join("fragment-labels.csv");
        write_labels(labels, &table, &[0, 0, 1]).unwrap();
        assert_eq!(
            std::fs::read_to_string(labels).unwrap(),
            "CONTIG_NAME,PARENT_NAME,BIN\nc1_0,c1,0\nc1_1,c1,0\nc2_0,c2,1\n"
        );
        let ref bins = dir.path().join("binning-assignment.csv");
        let elected = BTreeMap::from([("c2".to_string(), 1), ("c1".to_string(), 0)]);
        write_bins(bins, &elected).unwrap();
        assert_eq!(
            std::fs::read_to_string(bins).unwrap(),
            "CONTIG_NAME,BIN\nc1,0\nc2,1\n"
        );
        assert!(write_labels(labels, &table, &[0]).is_err());
    }

    #[test]
    fn keeps_commas_inside_quotes() {
        let csv = "CONTIG_NAME,PARENT_NAME,CLUSTER,k1\n\"c1,len=5\",\"c1,len=5\",0,1.0\n";
        let table = Table::parse(csv.as_bytes()).unwrap();
        assert_eq!(table.names(), &["c1,len=5"]);
        assert_eq!(table.parents(), &["c1,len=5"]);
        assert_eq!(table.samples().row(0), &[1.0]);
        let dir = tempfile::tempdir().unwrap();
        let ref labels = dir.path().join("fragment-labels.csv");
        write_labels(labels, &table, &[0]).unwrap();
        assert_eq!(
            std::fs::read_to_string(labels).unwrap(),
            "CONTIG_NAME,PARENT_NAME,BIN\n\"c1,len=5\",\"c1,len=5\",0\n"
        );
        let ref bins = dir.path().join("binning-assignment.csv");
        write_bins(bins, &BTreeMap::from([("c1,len=5".to_string(), 0)])).unwrap();
        assert_eq!(
            std::fs::read_to_string(bins).unwrap(),
            "CONTIG_NAME,BIN\n\"c1,len=5\",0\n"
        );
    }

    #[test]
    fn rejects_malformed_encoding() {
        let csv = b"CONTIG_NAME,PARENT_NAME,CLUSTER,k1\na,a,0,\xff\n";
        assert!(matches!(
            Table::parse(&csv[..]),
            Err(Error::Table { .. })
        ));
    }

    #[test]
    fn parses_truth() {
        let truth = parse_truth("SPECIES,CONTIG_NAME\nA,c1\nB,c2\n".as_bytes()).unwrap();
        assert_eq!(truth["c1"], "A");
        assert_eq!(truth["c2"], "B");
        assert!(parse_truth("CONTIG_NAME\nc1\n".as_bytes()).is_err());
    }
}
