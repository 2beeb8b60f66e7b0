use data_encoding::HEXLOWER;

use crate::record::Record;

/// A fixed-length group of records produced by one producer turn, handed off to the writer as a
/// single channel message.
pub(crate) type Batch = Vec<Record>;

/// Decide whether the record about to be generated at position `index` (out of `count` already
/// appended to the batch under construction) should reuse an existing record's `text` rather than
/// generate brand new random text. The default policy approximates a 1-in-500 chance, picking the
/// most recently appended record when it fires.
///
/// Matches the signature `should_reuse(count, index) -> bool` so that alternative policies can be
/// substituted without touching the producer loop.
pub(crate) fn should_reuse(count: usize, index: &mut usize) -> bool {
    if count == 0 {
        return false;
    }
    if rand::random::<u16>() % 500 == 0 {
        *index = count - 1;
        true
    } else {
        false
    }
}

/// A freshly generated record whose text is a random 16-byte hex string.
pub(crate) fn random_record() -> Record {
    let text = HEXLOWER.encode(&rand::random::<[u8; 16]>());
    Record::new(rand::random::<i64>(), text)
}

/// A record that reuses `source`'s text with a freshly generated number.
pub(crate) fn reused_record(source: &Record) -> Record {
    Record::new(rand::random::<i64>(), source.text().to_string())
}
