//! Sequence record handed to the k-mer filters.

/// One FASTA/FASTQ-style record. Filters only read `seq`; `qual` is empty
/// for FASTA input.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SeqRecord {
    pub id: String,
    pub comment: String,
    pub seq: String,
    pub qual: String,
}

impl SeqRecord {
    pub fn new(
        id: impl Into<String>,
        comment: impl Into<String>,
        seq: impl Into<String>,
        qual: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            comment: comment.into(),
            seq: seq.into(),
            qual: qual.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.seq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }
}
