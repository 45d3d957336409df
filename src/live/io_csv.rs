// Ballots as comma separated candidate ids, one ballot per line.
//
// 0,2,1
// 3,1
//
// Blank cells are ignored, so an empty line is an empty ballot.

use crate::live::*;

pub fn read_csv_ballots(path: &str) -> LiveResult<Vec<Ballot>> {
    let rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .context(CsvOpenSnafu { path })?;

    let mut res: Vec<Ballot> = Vec::new();
    for (idx, line_r) in rdr.into_records().enumerate() {
        let lineno = idx + 1;
        let line = line_r.context(CsvLineParseSnafu {})?;
        let mut choices: Vec<u32> = Vec::new();
        for cell in line.iter().filter(|c| !c.is_empty()) {
            let cid = cell.parse::<u32>().ok().context(CsvCellSnafu {
                lineno,
                cell: cell.to_string(),
            })?;
            choices.push(cid);
        }
        debug!("read_csv_ballots: lineno: {:?} row: {:?}", lineno, &choices);
        res.push(Ballot::from(choices));
    }
    Ok(res)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::live::io_common::test_path;
    use std::io::Write;

    fn write_tmp(name: &str, contents: &str) -> String {
        let p = test_path(name);
        let mut f = std::fs::File::create(&p).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        p
    }

    #[test]
    fn reads_ranked_rows() {
        let p = write_tmp("livevote_io_csv_ok.csv", "0, 2, 1\n3,1\n,\n1\n");
        let ballots = read_csv_ballots(&p).unwrap();
        assert_eq!(
            ballots,
            vec![
                Ballot::from(vec![0, 2, 1]),
                Ballot::from(vec![3, 1]),
                Ballot::default(),
                Ballot::from(vec![1]),
            ]
        );
    }

    #[test]
    fn rejects_names() {
        let p = write_tmp("livevote_io_csv_bad.csv", "0,1\nalice,2\n");
        match read_csv_ballots(&p) {
            Err(LiveError::CsvCell { lineno, cell }) => {
                assert_eq!(lineno, 2);
                assert_eq!(cell, "alice");
            }
            x => panic!("unexpected result {:?}", x),
        }
    }
}
