use super::*;
use crate::{schema::TableId, value::Value};

#[test]
fn row_fits_when_frame_exactly_fills_the_buffer() {
    let mut buffer = PayloadBuffer::with_limit(8);

    assert!(buffer.push_frame(b"abcd"));
    assert_eq!(buffer.remaining(), 0);
    assert!(!buffer.push_frame(b""));
    assert_eq!(buffer.frames().collect::<Vec<_>>(), [b"abcd".as_slice()]);
}

#[test]
fn failed_row_rolls_back_the_open_chain() {
    let mut delivery = PagedDelivery::default();
    let mut buffer = PayloadBuffer::with_limit(20);

    assert!(delivery.try_deliver(&mut buffer, b"p1", false));
    assert!(delivery.try_deliver(&mut buffer, b"c1", true));
    let committed = buffer.position();

    // second chain: parent fits, child does not
    assert!(delivery.try_deliver(&mut buffer, b"p2", false));
    assert!(!delivery.try_deliver(&mut buffer, b"child-too-long", true));

    assert_eq!(buffer.position(), committed);
    assert_eq!(buffer.safe_mark(), committed);
    assert_eq!(delivery.rows_delivered(), 1);
    assert_eq!(
        buffer.frames().collect::<Vec<_>>(),
        [b"p1".as_slice(), b"c1".as_slice()]
    );
}

#[test]
fn buffers_are_counted_once_and_only_when_non_empty() {
    let mut delivery = PagedDelivery::default();
    let mut buffer = PayloadBuffer::with_limit(16);

    assert_eq!(delivery.finish_buffer(&buffer), None);

    assert!(delivery.try_deliver(&mut buffer, b"row", true));
    assert_eq!(delivery.finish_buffer(&buffer), Some((1, 7)));
    assert_eq!(delivery.finish_buffer(&buffer), None);

    assert_eq!(delivery.buffers_delivered(), 1);
    assert_eq!(delivery.bytes_delivered(), 7);
}

#[test]
fn repeated_rows_accumulate() {
    let mut delivery = PagedDelivery::default();
    delivery.count_repeated(2);
    delivery.count_repeated(1);

    assert_eq!(delivery.rows_repeated(), 3);
}

#[test]
fn delivered_rows_decode_from_frames() {
    let mut buffer = PayloadBuffer::with_limit(256);
    let row = RowData::new(TableId(1), vec![Value::Int(5), Value::from("five")]);

    assert!(buffer.push_frame(&row.encode().expect("encode")));
    assert_eq!(buffer.rows().expect("rows"), [row]);

    buffer.clear();
    assert!(buffer.is_empty());
    assert_eq!(buffer.safe_mark(), 0);
}

#[test]
fn truncated_frame_ends_iteration() {
    let mut buffer = PayloadBuffer::with_limit(16);
    assert!(buffer.push_frame(b"abc"));
    buffer.bytes.extend_from_slice(&[0, 0, 0, 9, 1]);

    assert_eq!(buffer.frames().count(), 1);
}
