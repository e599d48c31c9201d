//! The fixed word lists drawing subjects are drawn from.

use rand::Rng;

/// Subjects for draw stages.
pub const ANIMALS: &[&str] = &[
    "alligator",
    "anteater",
    "armadillo",
    "badger",
    "bat",
    "bear",
    "beaver",
    "buffalo",
    "camel",
    "chameleon",
    "cheetah",
    "chipmunk",
    "chinchilla",
    "chupacabra",
    "coyote",
    "crow",
    "dinosaur",
    "dog",
    "dolphin",
    "dragon",
    "duck",
    "elephant",
    "fox",
    "frog",
    "giraffe",
    "goose",
    "grizzly",
    "hamster",
    "hedgehog",
    "hippo",
    "hyena",
    "jackal",
    "iguana",
    "kangaroo",
    "kiwi",
    "koala",
    "kraken",
    "leopard",
    "liger",
    "lion",
    "llama",
    "monkey",
    "moose",
    "nyan cat",
    "orangutan",
    "otter",
    "panda",
    "penguin",
    "platypus",
    "python",
    "pumpkin",
    "quagga",
    "quokka",
    "rabbit",
    "raccoon",
    "rhino",
    "sheep",
    "skunk",
    "squirrel",
    "tiger",
    "turtle",
    "unicorn",
    "walrus",
    "wolf",
];

/// Verbs for composed prompts.
pub const ACTIONS: &[&str] = &[
    "drawing",
    "eating",
    "singing",
    "walking on",
];

/// Objects for composed prompts.
pub const OBJECTS: &[&str] = &[
    "apple",
    "bottle of lotion",
    "blowdryer",
    "bracelet",
    "bread",
    "card",
    "cell phone",
    "coffee mug",
    "cowboy hat",
    "guitar",
    "jump rope",
    "mobile phone",
    "pants",
    "paper",
    "pencil",
    "ring",
    "rubber gloves",
    "scotch tape",
    "sketch pad",
    "sticky note",
];

fn pick(list: &'static [&'static str]) -> &'static str {
    list[rand::rng().random_range(0..list.len())]
}

/// A uniformly random draw-stage subject.
pub fn random_subject() -> &'static str {
    pick(ANIMALS)
}

pub fn random_action() -> &'static str {
    pick(ACTIONS)
}

pub fn random_object() -> &'static str {
    pick(OBJECTS)
}

/// Composes a full prompt sentence, e.g. "walrus eating a coffee mug".
pub fn random_sentence() -> String {
    let animal = random_subject();
    let action = random_action();
    let object = random_object();
    let article = if object.starts_with('a') { "an" } else { "a" };
    format!("{animal} {action} {article} {object}")
}
