pub const MOLE: &str = r"
        _.-----._
      .'         '.
     /  .-.   .-.  \
    |   (o)   (o)   |      acmemole
     \      A      /       it digs for TXT records
      '.  \___/  .'
     .-''-.....-''-.
    /   dig @here   \
";
