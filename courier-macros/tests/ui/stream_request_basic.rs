use courier::message::StreamRequest;
use courier_macros::stream_request;

#[stream_request(item = char)]
struct Letters;

#[stream_request(item = (u32, String), name = "feed.tail")]
enum Tail {
    FromStart,
    Since(u32),
}

fn main() {
    assert_eq!(<Letters as StreamRequest>::NAME, "Letters");
    assert_eq!(<Tail as StreamRequest>::NAME, "feed.tail");
    let item: <Tail as StreamRequest>::Item = (1, "x".into());
    assert_eq!(item.0, 1);
    println!("{:?} {:?} {:?}", Letters, Tail::FromStart, Tail::Since(3));
}
