use courier::message::Request;
use courier_macros::request;

#[request(response = Vec<String>)]
struct ListUsers {
    limit: usize,
}

#[request(response = u64, name = "billing.balance")]
struct GetBalance(u32);

fn name_of<R: Request>(_: &R) -> &'static str {
    R::NAME
}

fn main() {
    let list = ListUsers { limit: 10 };
    assert_eq!(name_of(&list), "ListUsers");
    assert_eq!(list.limit, 10);
    assert_eq!(name_of(&GetBalance(7)), "billing.balance");
    let _: <ListUsers as Request>::Response = vec!["ann".to_string()];
    println!("{:?}", GetBalance(7));
}
